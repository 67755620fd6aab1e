use crate::distributions::Policy;
use crate::net::{Mlp, build_mlp, scale_layer};
use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{Module, VarBuilder, VarMap};
use std::f32;

/// Gaussian policy with a state-dependent mean and a fixed unit standard
/// deviation (exp of an all-zero log-std). Only the mean network is learned.
#[derive(Debug, Clone)]
pub struct DiagGaussianActor {
    mu_net: Mlp,
    log_std: Tensor,
}

impl DiagGaussianActor {
    /// Registers the mean network's parameters in `varmap`. The output layer
    /// starts at a tenth of its initialization with a zero bias, so early
    /// actions stay low-magnitude.
    pub fn build(
        obs_dim: usize,
        action_dim: usize,
        hidden: &[usize],
        varmap: &VarMap,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        let mut layers: Vec<usize> = hidden.to_vec();
        layers.push(action_dim);
        let mu_net = build_mlp(obs_dim, &layers, &vb, "actor")?;
        scale_layer(varmap, "actor", layers.len() - 1, 0.1)?;
        let log_std = Tensor::zeros(action_dim, DType::F32, device)?;
        Ok(Self { mu_net, log_std })
    }

    /// Distribution means for a batch of states.
    pub fn mean(&self, states: &Tensor) -> Result<Tensor> {
        self.mu_net.forward(states)
    }

    /// `(mean, std)` for a batch of states; std is constant across states.
    pub fn forward(&self, states: &Tensor) -> Result<(Tensor, Tensor)> {
        let mu = self.mu_net.forward(states)?;
        let std = self.log_std.exp()?.broadcast_as(mu.shape())?;
        Ok((mu, std))
    }

    pub fn log_std(&self) -> &Tensor {
        &self.log_std
    }
}

impl Policy for DiagGaussianActor {
    fn get_action(&self, observation: &Tensor) -> Result<Tensor> {
        let (mu, std) = self.forward(&observation.unsqueeze(0)?)?;
        let noise = Tensor::randn(0f32, 1., std.shape(), std.device())?;
        let action = (mu + std.mul(&noise)?)?.squeeze(0)?.detach();
        Ok(action)
    }

    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let mu = self.mu_net.forward(states)?;
        let std = self.log_std.exp()?.broadcast_as(mu.shape())?;
        let var = std.sqr()?;
        let log_sqrt_2pi = f32::ln(f32::sqrt(2f32 * f32::consts::PI));
        let log_probs = (((actions - &mu)?.sqr()?.div(&(var * 2.0)?)?.neg()?
            .broadcast_sub(&self.log_std)?)
            - log_sqrt_2pi as f64)?;
        log_probs.sum(1)
    }

    fn entropy(&self) -> Result<Tensor> {
        let log_2pi_plus_1_div_2 = Tensor::full(
            0.5 * ((2. * f32::consts::PI).ln() + 1.),
            self.log_std.shape(),
            self.log_std.device(),
        )?;
        log_2pi_plus_1_div_2.add(&self.log_std)?.sum_all()
    }
}

#[cfg(test)]
mod test {
    use super::DiagGaussianActor;
    use crate::distributions::Policy;
    use candle_core::{Device, Result, Tensor};
    use candle_nn::VarMap;
    use std::f32;

    #[test]
    fn log_prob_matches_closed_form_at_the_mean() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let actor = DiagGaussianActor::build(3, 2, &[8], &varmap, &device)?;
        let states = Tensor::zeros((4, 3), candle_core::DType::F32, &device)?;
        let actions = actor.mean(&states)?.detach();
        let logp = actor.log_probs(&states, &actions)?;
        // unit std and action == mean: -0.5 * ln(2*pi) per dimension
        let expected = -0.5 * (2. * f32::consts::PI).ln() * 2.;
        for got in logp.to_vec1::<f32>()? {
            assert!((got - expected).abs() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn entropy_of_a_unit_gaussian() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let actor = DiagGaussianActor::build(3, 2, &[8], &varmap, &device)?;
        let expected = (0.5 * ((2. * f32::consts::PI).ln() + 1.)) * 2.;
        assert!((actor.entropy()?.to_scalar::<f32>()? - expected).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn fresh_actor_keeps_actions_low_magnitude() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let actor = DiagGaussianActor::build(3, 1, &[16, 16], &varmap, &device)?;
        let states = Tensor::ones((8, 3), candle_core::DType::F32, &device)?;
        let mu = actor
            .mean(&states)?
            .abs()?
            .flatten_all()?
            .max(0)?
            .to_scalar::<f32>()?;
        // output layer is scaled down at init, means start close to zero
        assert!(mu < 0.5, "initial mean magnitude too large: {mu}");
        Ok(())
    }
}
