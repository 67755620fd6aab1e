use crate::tensors::Returns;
use candle_core::{Device, Result, Tensor};

/// Transitions collected from one episode.
#[derive(Debug, Default)]
pub struct RolloutBuffer {
    pub states: Vec<Tensor>,
    pub actions: Vec<Tensor>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
}

impl RolloutBuffer {
    pub fn push_step(&mut self, state: Tensor, action: Tensor, reward: f32, done: bool) {
        self.states.push(state);
        self.actions.push(action);
        self.rewards.push(reward);
        self.dones.push(done);
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Continuation masks: 0 where a transition ended an episode, 1 otherwise.
    pub fn masks(&self) -> Vec<f32> {
        self.dones.iter().map(|d| if *d { 0. } else { 1. }).collect()
    }
}

/// Discounted returns by a single backward scan. A zero mask stops the
/// carried sum at episode boundaries.
pub fn compute_returns(rewards: &[f32], masks: &[f32], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.; rewards.len()];
    let mut running = 0f32;
    for t in (0..rewards.len()).rev() {
        running = rewards[t] + gamma * running * masks[t];
        returns[t] = running;
    }
    returns
}

/// One flat batch over a set of rollouts, in collection order. Built fresh
/// each iteration and consumed by a single update.
pub struct TrajectoryBatch {
    pub states: Tensor,
    pub actions: Tensor,
    pub returns: Returns,
}

impl TrajectoryBatch {
    pub fn from_rollouts(rollouts: &[RolloutBuffer], gamma: f32, device: &Device) -> Result<Self> {
        let mut states = vec![];
        let mut actions = vec![];
        let mut returns = vec![];
        for roll in rollouts {
            states.extend(roll.states.iter());
            actions.extend(roll.actions.iter());
            returns.extend(compute_returns(&roll.rewards, &roll.masks(), gamma));
        }
        let states = Tensor::stack(&states, 0)?;
        let actions = Tensor::stack(&actions, 0)?;
        let returns = Returns(Tensor::from_slice(&returns, returns.len(), device)?);
        Ok(Self {
            states,
            actions,
            returns,
        })
    }

    pub fn len(&self) -> usize {
        self.returns.0.elem_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
