pub mod diagonal_distribution;

use candle_core::{Result, Tensor};
pub use diagonal_distribution::DiagGaussianActor;

/// A stochastic policy: maps observations to an action distribution.
pub trait Policy {
    /// Draws one action for a single (unbatched) observation.
    fn get_action(&self, observation: &Tensor) -> Result<Tensor>;
    /// Log-density of each action under the distribution at each state,
    /// summed over action dimensions.
    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor>;
    fn entropy(&self) -> Result<Tensor>;
}

/// KL(p || q) between two diagonal Gaussians, summed over action dimensions
/// and averaged over the batch.
///
/// Means are `(batch, action_dim)`, log-stds are `(action_dim,)`. Exactly
/// zero when both parameter sets coincide.
pub fn kl_divergence(
    mu_p: &Tensor,
    log_std_p: &Tensor,
    mu_q: &Tensor,
    log_std_q: &Tensor,
) -> Result<Tensor> {
    let var_p = (log_std_p * 2.0)?.exp()?;
    let var_q = (log_std_q * 2.0)?.exp()?;
    let log_ratio = (log_std_q - log_std_p)?;
    let quad = (mu_p - mu_q)?
        .sqr()?
        .broadcast_add(&var_p)?
        .broadcast_div(&(var_q * 2.0)?)?;
    let per_dim = (quad.broadcast_add(&log_ratio)? - 0.5)?;
    per_dim.sum(1)?.mean_all()
}

#[cfg(test)]
mod test {
    use super::kl_divergence;
    use candle_core::{Device, Result, Tensor};

    #[test]
    fn kl_of_a_distribution_with_itself_is_zero() -> Result<()> {
        let device = Device::Cpu;
        let mu = Tensor::from_slice(&[0.3f32, -1.2, 0.0, 4.5, 2.25, -0.75], (3, 2), &device)?;
        let log_std = Tensor::from_slice(&[0.0f32, 0.5], 2, &device)?;
        let kl = kl_divergence(&mu, &log_std, &mu, &log_std)?;
        assert_eq!(kl.to_scalar::<f32>()?, 0.0);
        Ok(())
    }

    #[test]
    fn kl_between_shifted_unit_gaussians() -> Result<()> {
        let device = Device::Cpu;
        // unit variance both sides: KL = sum((mu_p - mu_q)^2) / 2
        let mu_p = Tensor::from_slice(&[1.0f32, 0.0], (1, 2), &device)?;
        let mu_q = Tensor::from_slice(&[0.0f32, 2.0], (1, 2), &device)?;
        let log_std = Tensor::zeros(2, candle_core::DType::F32, &device)?;
        let kl = kl_divergence(&mu_p, &log_std, &mu_q, &log_std)?;
        assert!((kl.to_scalar::<f32>()? - 2.5).abs() < 1e-6);
        Ok(())
    }
}
