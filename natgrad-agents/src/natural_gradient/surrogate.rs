use candle_core::{Result, Tensor};
use natgrad_core::{
    distributions::{DiagGaussianActor, Policy},
    tensors::{LogpOld, Returns},
};

/// Importance-weighted policy-gradient objective,
/// `mean(exp(logp - logp_old) * return)`.
///
/// `logp_old` only supplies the ratio's denominator; it is detached at
/// construction so no gradient flows back through the behavior policy's own
/// evaluation. The gradient of this scalar is the ascent direction.
pub fn surrogate_objective(
    actor: &DiagGaussianActor,
    states: &Tensor,
    actions: &Tensor,
    returns: &Returns,
    logp_old: &LogpOld,
) -> Result<Tensor> {
    let logp = actor.log_probs(states, actions)?;
    let ratio = (logp - &logp_old.0)?.exp()?;
    (ratio * &returns.0)?.mean_all()
}
