use anyhow::Result;
use candle_core::Device;
use clap::{Parser, ValueEnum};
use natgrad_agents::{
    ddpg::{Ddpg, DdpgConfig},
    natural_gradient::{
        NaturalGradientConfig, NaturalPolicyGradient, StepRule, line_search::BacktrackParams,
    },
};
use natgrad_core::{
    Algorithm,
    config::TrainerConfig,
    off_policy_algorithm::OffPolicyAlgorithm,
    on_policy_algorithm::OnPolicyAlgorithm,
    telemetry::{ConsoleSink, JsonlSink, MetricSink},
};
use natgrad_envs::Pendulum;
use std::path::PathBuf;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
enum Algo {
    /// Trust-region natural gradient with a backtracking line search.
    Trpo,
    /// Natural gradient with a fixed half-scale step.
    Tnpg,
    /// Deterministic actor-critic with target networks.
    Ddpg,
}

#[derive(Parser, Debug)]
#[command(about = "Train a continuous-control policy on the pendulum swing-up task")]
struct Args {
    #[arg(long, value_enum, default_value = "trpo")]
    algo: Algo,
    #[arg(long, default_value_t = 0.99)]
    gamma: f32,
    #[arg(long, default_value_t = 64)]
    hidden_size: usize,
    /// KL budget per trust-region step.
    #[arg(long, default_value_t = 1e-2)]
    max_kl: f64,
    #[arg(long, default_value_t = 500)]
    max_iter_num: usize,
    /// Samples collected per on-policy iteration.
    #[arg(long, default_value_t = 2048)]
    total_sample_size: usize,
    #[arg(long, default_value_t = 5)]
    log_interval: usize,
    /// Rolling-average score that ends the run with a checkpoint.
    #[arg(long, default_value_t = -200.0)]
    goal_score: f32,
    #[arg(long, default_value = "./save_model")]
    save_path: PathBuf,
    /// Also append metrics to this JSONL file.
    #[arg(long)]
    metrics_path: Option<PathBuf>,
    #[arg(long, default_value_t = 500)]
    seed: u64,
    #[arg(long)]
    render: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
    let args = Args::parse();

    let device = Device::Cpu;
    let env = Pendulum::new(device.clone());
    let config = TrainerConfig {
        gamma: args.gamma,
        max_iterations: args.max_iter_num,
        total_sample_size: args.total_sample_size,
        max_episode_steps: 200,
        log_interval: args.log_interval,
        goal_score: args.goal_score,
        save_path: args.save_path.clone(),
        render: args.render,
        seed: args.seed,
    };
    let sink: Box<dyn MetricSink> = match &args.metrics_path {
        Some(path) => Box::new(JsonlSink::create(path)?),
        None => Box::new(ConsoleSink),
    };

    match args.algo {
        Algo::Trpo | Algo::Tnpg => {
            let step_rule = if args.algo == Algo::Trpo {
                StepRule::TrustRegion(BacktrackParams {
                    max_kl: args.max_kl,
                    ..Default::default()
                })
            } else {
                StepRule::FixedScale { scale: 0.5 }
            };
            let agent_config = NaturalGradientConfig {
                gamma: args.gamma,
                step_rule,
                ..Default::default()
            };
            let agent = NaturalPolicyGradient::new(
                Pendulum::OBSERVATION_DIM,
                Pendulum::ACTION_DIM,
                &[args.hidden_size, args.hidden_size],
                agent_config,
                device,
            )?;
            OnPolicyAlgorithm {
                env,
                agent,
                sink,
                config,
            }
            .train()?;
        }
        Algo::Ddpg => {
            let agent = Ddpg::new(
                Pendulum::OBSERVATION_DIM,
                Pendulum::ACTION_DIM,
                args.hidden_size,
                DdpgConfig {
                    gamma: args.gamma,
                    ..Default::default()
                },
                args.seed,
                device,
            )?;
            OffPolicyAlgorithm {
                env,
                agent,
                sink,
                config,
            }
            .train()?;
        }
    }
    Ok(())
}
