use candle_core::{Device, Result};
use natgrad_agents::natural_gradient::{
    NaturalGradientConfig, NaturalPolicyGradient, StepRule, line_search::BacktrackParams,
};
use natgrad_core::{
    Algorithm, config::TrainerConfig, on_policy_algorithm::OnPolicyAlgorithm,
    telemetry::RecordingSink,
};
use natgrad_envs::PointTarget;
use std::path::PathBuf;

fn toy_trainer_config() -> TrainerConfig {
    TrainerConfig {
        gamma: 0.9,
        max_iterations: 15,
        total_sample_size: 512,
        max_episode_steps: 16,
        log_interval: 1,
        // unreachable: every reward is negative, so the run never stops early
        goal_score: 0.,
        save_path: PathBuf::from("./save_model"),
        render: false,
        seed: 500,
    }
}

fn recorded_scores(step_rule: StepRule, iterations: usize) -> Result<Vec<f32>> {
    let device = Device::Cpu;
    let config = TrainerConfig {
        max_iterations: iterations,
        ..toy_trainer_config()
    };
    let agent_config = NaturalGradientConfig {
        gamma: config.gamma,
        step_rule,
        ..Default::default()
    };
    let agent = NaturalPolicyGradient::new(
        PointTarget::OBSERVATION_DIM,
        PointTarget::ACTION_DIM,
        &[16, 16],
        agent_config,
        device.clone(),
    )?;
    let env = PointTarget::new(2.0, config.max_episode_steps, device);
    let mut algo = OnPolicyAlgorithm {
        env,
        agent,
        sink: RecordingSink::default(),
        config,
    };
    algo.train()?;
    Ok(algo.sink.records.iter().map(|r| r.2).collect())
}

/// The rolling average score on a deterministic task with a known optimal
/// action climbs across iterations, allowing bounded sampling noise.
#[test]
fn trust_region_updates_improve_the_rolling_score() -> Result<()> {
    let step_rule = StepRule::TrustRegion(BacktrackParams {
        max_kl: 5e-2,
        ..Default::default()
    });
    let scores = recorded_scores(step_rule, 15)?;
    assert_eq!(scores.len(), 15);

    let first = scores[0];
    let last = *scores.last().unwrap();
    assert!(
        last > first + 20.,
        "no clear improvement: first {first}, last {last}"
    );
    for pair in scores.windows(2) {
        assert!(
            pair[1] > pair[0] - 15.,
            "rolling average regressed beyond noise: {pair:?}"
        );
    }
    Ok(())
}

/// The fixed-scale variant shares the whole pipeline except the line search
/// and should also make headway on the toy task.
#[test]
fn fixed_scale_updates_improve_the_rolling_score() -> Result<()> {
    let scores = recorded_scores(StepRule::FixedScale { scale: 0.5 }, 10)?;
    let first = scores[0];
    let last = *scores.last().unwrap();
    assert!(
        last > first + 5.,
        "no clear improvement: first {first}, last {last}"
    );
    Ok(())
}
