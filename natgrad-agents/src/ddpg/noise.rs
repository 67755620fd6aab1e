use candle_core::{Device, Result, Tensor};

/// Ornstein-Uhlenbeck process: temporally correlated exploration noise that
/// decays back towards `mu`.
#[derive(Debug)]
pub struct OuNoise {
    theta: f32,
    mu: f32,
    sigma: f32,
    state: Tensor,
}

impl OuNoise {
    pub fn new(action_dim: usize, theta: f32, mu: f32, sigma: f32, device: &Device) -> Result<Self> {
        let state = Tensor::full(mu, action_dim, device)?;
        Ok(Self {
            theta,
            mu,
            sigma,
            state,
        })
    }

    /// Restarts the process at its mean; called at episode boundaries.
    pub fn reset(&mut self) -> Result<()> {
        self.state = Tensor::full(self.mu, self.state.shape(), self.state.device())?;
        Ok(())
    }

    /// Advances the process one step and returns the new noise value.
    pub fn sample(&mut self) -> Result<Tensor> {
        let gauss = Tensor::randn(0f32, 1., self.state.shape(), self.state.device())?;
        let drift = (self.state.affine(-1.0, self.mu as f64)? * self.theta as f64)?;
        let diffusion = (gauss * self.sigma as f64)?;
        self.state = ((&self.state + &drift)? + diffusion)?;
        Ok(self.state.clone())
    }
}
