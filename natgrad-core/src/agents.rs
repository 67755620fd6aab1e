use crate::distributions::Policy;
use crate::utils::rollout_buffer::RolloutBuffer;
use candle_core::{Result, Tensor};
use candle_nn::VarMap;
use std::fmt;

/// What happened to the parameters during one update attempt.
///
/// The recoverable fault classes (non-positive curvature, exhausted line
/// search) are values rather than errors: the training loop logs them and
/// keeps going with the pre-update parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The update was applied to the live parameters.
    Updated,
    /// The line search exhausted its budget; parameters were restored.
    Reverted,
    /// The update was abandoned before any parameter write.
    Skipped { reason: String },
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated => write!(f, "updated"),
            Self::Reverted => write!(f, "reverted"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
        }
    }
}

/// On-policy agent: consumes a fresh batch of rollouts per update.
pub trait Agent {
    type Policy: Policy;

    /// The policy driving rollout collection.
    fn policy(&self) -> &Self::Policy;

    /// The learnable parameters, for checkpointing.
    fn var_map(&self) -> &VarMap;

    /// Runs one update on freshly collected rollouts.
    fn learn(&mut self, rollouts: Vec<RolloutBuffer>) -> Result<StepOutcome>;
}

/// Off-policy agent: acts with exploration noise, digests transitions one at
/// a time and updates from replayed minibatches.
pub trait OffPolicyAgent {
    /// Exploration action for a single observation.
    fn act(&mut self, state: &Tensor) -> Result<Tensor>;

    fn observe(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: f32,
        next_state: &Tensor,
        done: bool,
    );

    /// Whether enough experience has accumulated to start updating.
    fn ready(&self) -> bool;

    fn update(&mut self) -> Result<()>;

    /// Called at episode starts (e.g. to reset correlated noise).
    fn begin_episode(&mut self) -> Result<()>;

    /// The learnable policy parameters, for checkpointing.
    fn var_map(&self) -> &VarMap;
}
