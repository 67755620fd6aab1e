use crate::{
    Algorithm,
    agents::OffPolicyAgent,
    checkpoint::save_policy,
    config::TrainerConfig,
    env::{Env, rollout_seed, seed_rollouts},
    telemetry::MetricSink,
    utils::running_score::RunningScore,
};
use candle_core::Result;
use tracing::info;

/// Off-policy training loop: act with exploration noise, store every
/// transition, and update from replay after each step once enough
/// experience has accumulated.
pub struct OffPolicyAlgorithm<E: Env, A: OffPolicyAgent, S: MetricSink> {
    pub env: E,
    pub agent: A,
    pub sink: S,
    pub config: TrainerConfig,
}

impl<E: Env, A: OffPolicyAgent, S: MetricSink> Algorithm for OffPolicyAlgorithm<E, A, S> {
    fn train(&mut self) -> Result<()> {
        seed_rollouts(self.config.seed);
        let mut scores = RunningScore::new(100);
        for episode in 0..self.config.max_iterations {
            let mut state = self.env.reset(rollout_seed())?;
            self.agent.begin_episode()?;
            let mut score = 0.;
            for _ in 0..self.config.max_episode_steps {
                if self.config.render {
                    self.env.render();
                }
                let action = self.agent.act(&state)?;
                let (next_state, reward, terminated, truncated) = self.env.step(&action)?;
                let done = terminated || truncated;
                self.agent
                    .observe(&state, &action, reward, &next_state, done);
                if self.agent.ready() {
                    self.agent.update()?;
                }
                score += reward;
                state = next_state;
                if done {
                    break;
                }
            }
            scores.push(score);
            let Some(score_avg) = scores.mean() else {
                continue;
            };
            if episode % self.config.log_interval == 0 {
                self.sink.record(episode, scores.episodes(), score_avg);
            }
            if score_avg > self.config.goal_score {
                let path = save_policy(
                    self.agent.var_map(),
                    &self.config.save_path,
                    "model.safetensors",
                )?;
                info!(
                    score_avg = score_avg as f64,
                    path = %path.display(),
                    "goal score reached, checkpoint saved"
                );
                break;
            }
        }
        Ok(())
    }
}
