use candle_core::{Result, Tensor};
use natgrad_core::{
    distributions::{DiagGaussianActor, kl_divergence},
    flat::FlatView,
    utils::dot,
};

/// The damped Fisher-information product `(F + damping·I)·v`, evaluated
/// without ever materializing `F`.
///
/// The Fisher matrix is the curvature of the policy's KL divergence from a
/// frozen copy of itself at the evaluation point. candle's autodiff is
/// first-order only, so the curvature is taken as a central finite
/// difference of the KL gradient along `v`: two gradient evaluations at
/// `theta ± eps·v/|v|`. The KL gradient is itself a first-order backward
/// pass, and for this policy family it varies near-linearly along any
/// direction, so the difference quotient tracks the exact product to
/// O(eps^2); the damping floor dominates the residual noise.
///
/// Applying the operator perturbs the live parameters and restores them
/// before returning; callers never observe an intermediate state.
pub struct FisherVectorProduct<'a> {
    actor: &'a DiagGaussianActor,
    view: &'a FlatView,
    states: &'a Tensor,
    theta: Tensor,
    mu_old: Tensor,
    damping: f64,
    fd_eps: f64,
}

impl<'a> FisherVectorProduct<'a> {
    /// Freezes the evaluation point: the current flat parameters and the
    /// detached distribution means over `states`.
    pub fn new(
        actor: &'a DiagGaussianActor,
        view: &'a FlatView,
        states: &'a Tensor,
        damping: f64,
        fd_eps: f64,
    ) -> Result<Self> {
        let theta = view.flatten()?;
        let mu_old = actor.mean(states)?.detach();
        Ok(Self {
            actor,
            view,
            states,
            theta,
            mu_old,
            damping,
            fd_eps,
        })
    }

    /// Distribution means at the evaluation point, detached.
    pub fn snapshot_means(&self) -> &Tensor {
        &self.mu_old
    }

    fn kl_grad_at(&self, flat: &Tensor) -> Result<Tensor> {
        self.view.unflatten_into(flat)?;
        let mu = self.actor.mean(self.states)?;
        let kl = kl_divergence(
            &self.mu_old,
            self.actor.log_std(),
            &mu,
            self.actor.log_std(),
        )?;
        let grads = kl.backward()?;
        self.view.flatten_grads(&grads)
    }

    /// `(F + damping·I)·v`.
    pub fn apply(&self, v: &Tensor) -> Result<Tensor> {
        let v_norm = dot(v, v)?.sqrt();
        if v_norm == 0.0 {
            return v.zeros_like();
        }
        let h = self.fd_eps / v_norm;
        let offset = (v * h)?;
        let plus = self.kl_grad_at(&(&self.theta + &offset)?)?;
        let minus = self.kl_grad_at(&(&self.theta - &offset)?)?;
        self.view.unflatten_into(&self.theta)?;
        let hv = ((plus - minus)? / (2.0 * h))?;
        &hv + &(v * self.damping)?
    }
}
