use crate::{
    Algorithm,
    agents::{Agent, StepOutcome},
    checkpoint::save_policy,
    config::TrainerConfig,
    env::{Env, run_episode, seed_rollouts},
    telemetry::MetricSink,
    utils::{rollout_buffer::RolloutBuffer, running_score::RunningScore},
};
use candle_core::Result;
use tracing::{info, warn};

/// On-policy training loop: collect a fresh quota of samples, run exactly
/// one update on them, repeat until the iteration budget or the goal score
/// is reached.
///
/// Everything happens strictly in sequence on one thread; the agent's live
/// parameters have a single writer and no reader overlaps a write.
pub struct OnPolicyAlgorithm<E: Env, A: Agent, S: MetricSink> {
    pub env: E,
    pub agent: A,
    pub sink: S,
    pub config: TrainerConfig,
}

impl<E: Env, A: Agent, S: MetricSink> OnPolicyAlgorithm<E, A, S> {
    /// Whole episodes until the sample quota is met; the final episode runs
    /// to its own end, so the batch may slightly exceed the quota.
    fn collect_rollouts(&mut self, scores: &mut RunningScore) -> Result<Vec<RolloutBuffer>> {
        let mut rollouts = vec![];
        let mut steps = 0;
        while steps < self.config.total_sample_size {
            let mut buffer = RolloutBuffer::default();
            let score = run_episode(
                self.agent.policy(),
                &mut self.env,
                self.config.max_episode_steps,
                self.config.render,
                &mut buffer,
            )?;
            steps += buffer.len();
            scores.push(score);
            rollouts.push(buffer);
        }
        Ok(rollouts)
    }
}

impl<E: Env, A: Agent, S: MetricSink> Algorithm for OnPolicyAlgorithm<E, A, S> {
    fn train(&mut self) -> Result<()> {
        seed_rollouts(self.config.seed);
        let mut scores = RunningScore::new(100);
        for iteration in 0..self.config.max_iterations {
            let rollouts = self.collect_rollouts(&mut scores)?;
            match self.agent.learn(rollouts)? {
                StepOutcome::Updated => {}
                StepOutcome::Reverted => {
                    warn!(iteration, "surrogate not improved, parameters reverted")
                }
                StepOutcome::Skipped { reason } => {
                    warn!(iteration, reason = reason.as_str(), "update skipped")
                }
            }
            let Some(score_avg) = scores.mean() else {
                continue;
            };
            if iteration % self.config.log_interval == 0 {
                self.sink.record(iteration, scores.episodes(), score_avg);
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
