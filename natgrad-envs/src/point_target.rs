use candle_core::{Device, Result, Tensor};
use natgrad_core::env::Env;

/// Deterministic one-dimensional diagnostic task: the observation is a
/// constant, the reward is `-(action - target)^2`, and episodes truncate
/// after a fixed number of steps. The optimal policy emits `target`
/// regardless of state, which makes learning progress easy to assert on.
pub struct PointTarget {
    target: f32,
    episode_len: usize,
    step_count: usize,
    device: Device,
}

impl PointTarget {
    pub const OBSERVATION_DIM: usize = 1;
    pub const ACTION_DIM: usize = 1;

    pub fn new(target: f32, episode_len: usize, device: Device) -> Self {
        Self {
            target,
            episode_len,
            step_count: 0,
            device,
        }
    }

    fn observation(&self) -> Result<Tensor> {
        Tensor::zeros(Self::OBSERVATION_DIM, candle_core::DType::F32, &self.device)
    }
}

impl Env for PointTarget {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        self.step_count = 0;
        self.observation()
    }

    fn step(&mut self, action: &Tensor) -> Result<(Tensor, f32, bool, bool)> {
        let a = action.to_vec1::<f32>()?[0];
        let reward = -(a - self.target).powi(2);
        self.step_count += 1;
        let truncated = self.step_count >= self.episode_len;
        Ok((self.observation()?, reward, false, truncated))
    }
}
