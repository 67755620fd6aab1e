use candle_core::{Device, Result, Tensor};
use natgrad_core::env::Env;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::f32::consts::PI;

const GRAVITY: f32 = 10.0;
const MASS: f32 = 1.0;
const LENGTH: f32 = 1.0;
const DT: f32 = 0.05;
const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;

fn angle_normalize(x: f32) -> f32 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

/// The classic pendulum swing-up task, ported from the gym environment.
///
/// Observations are `[cos θ, sin θ, θ̇]`, the action is a single torque in
/// `[-2, 2]`, and the reward penalizes distance from upright, angular speed
/// and applied torque. Episodes never terminate; they truncate after 200
/// steps.
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    step_count: usize,
    max_steps: usize,
    device: Device,
}

impl Pendulum {
    pub const OBSERVATION_DIM: usize = 3;
    pub const ACTION_DIM: usize = 1;

    pub fn new(device: Device) -> Self {
        Self {
            theta: 0.,
            theta_dot: 0.,
            step_count: 0,
            max_steps: 200,
            device,
        }
    }

    fn observation(&self) -> Result<Tensor> {
        Tensor::from_slice(
            &[self.theta.cos(), self.theta.sin(), self.theta_dot],
            Self::OBSERVATION_DIM,
            &self.device,
        )
    }
}

impl Env for Pendulum {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.theta = rng.random_range(-PI..PI);
        self.theta_dot = rng.random_range(-1.0..1.0);
        self.step_count = 0;
        self.observation()
    }

    fn step(&mut self, action: &Tensor) -> Result<(Tensor, f32, bool, bool)> {
        let torque = action.to_vec1::<f32>()?[0].clamp(-MAX_TORQUE, MAX_TORQUE);
        let cost = angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * torque.powi(2);

        self.theta_dot += (3.0 * GRAVITY / (2.0 * LENGTH) * self.theta.sin()
            + 3.0 / (MASS * LENGTH * LENGTH) * torque)
            * DT;
        self.theta_dot = self.theta_dot.clamp(-MAX_SPEED, MAX_SPEED);
        self.theta += self.theta_dot * DT;

        self.step_count += 1;
        let truncated = self.step_count >= self.max_steps;
        Ok((self.observation()?, -cost, false, truncated))
    }
}

#[cfg(test)]
mod test {
    use super::Pendulum;
    use candle_core::{Device, Result, Tensor};
    use natgrad_core::env::Env;

    #[test]
    fn resets_are_reproducible_per_seed() -> Result<()> {
        let mut env = Pendulum::new(Device::Cpu);
        let a = env.reset(42)?.to_vec1::<f32>()?;
        let b = env.reset(42)?.to_vec1::<f32>()?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn episodes_truncate_after_two_hundred_steps() -> Result<()> {
        let mut env = Pendulum::new(Device::Cpu);
        env.reset(0)?;
        let torque = Tensor::zeros(1, candle_core::DType::F32, &Device::Cpu)?;
        for step in 1..=200 {
            let (_obs, reward, terminated, truncated) = env.step(&torque)?;
            assert!(!terminated);
            assert!(reward <= 0.);
            assert_eq!(truncated, step == 200);
        }
        Ok(())
    }
}
