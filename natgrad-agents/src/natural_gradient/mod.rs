pub mod cg;
pub mod fisher;
pub mod line_search;
pub mod surrogate;

use candle_core::{Device, Result};
use candle_nn::VarMap;
use cg::conjugate_gradient;
use fisher::FisherVectorProduct;
use line_search::{BacktrackParams, SearchResult, backtracking_line_search};
use natgrad_core::{
    agents::{Agent, StepOutcome},
    distributions::{DiagGaussianActor, Policy, kl_divergence},
    flat::FlatView,
    tensors::LogpOld,
    utils::{
        dot,
        rollout_buffer::{RolloutBuffer, TrajectoryBatch},
    },
};
use surrogate::surrogate_objective;
use tracing::{debug, warn};

/// How a conjugate-gradient direction becomes a parameter step.
#[derive(Debug, Clone)]
pub enum StepRule {
    /// Scale to the divergence budget, then backtrack until the step is
    /// acceptable or proven useless (TRPO).
    TrustRegion(BacktrackParams),
    /// A fixed fraction of the raw direction, no search (TNPG).
    FixedScale { scale: f64 },
}

#[derive(Debug, Clone)]
pub struct NaturalGradientConfig {
    pub gamma: f32,
    /// Tikhonov term added to every Fisher product.
    pub damping: f64,
    /// Finite-difference probe length for the curvature operator.
    pub fd_eps: f64,
    pub cg_iterations: usize,
    pub step_rule: StepRule,
}

impl Default for NaturalGradientConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            damping: 0.1,
            fd_eps: 1e-2,
            cg_iterations: 10,
            step_rule: StepRule::TrustRegion(BacktrackParams::default()),
        }
    }
}

/// Policy-gradient agent whose ascent direction is preconditioned by the
/// inverse Fisher metric. One `learn` call runs the whole update cycle:
/// returns, surrogate gradient, conjugate-gradient solve, step rule.
pub struct NaturalPolicyGradient {
    actor: DiagGaussianActor,
    varmap: VarMap,
    view: FlatView,
    config: NaturalGradientConfig,
    device: Device,
}

impl NaturalPolicyGradient {
    pub fn new(
        obs_dim: usize,
        action_dim: usize,
        hidden: &[usize],
        config: NaturalGradientConfig,
        device: Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let actor = DiagGaussianActor::build(obs_dim, action_dim, hidden, &varmap, &device)?;
        let view = FlatView::from_varmap(&varmap);
        Ok(Self {
            actor,
            varmap,
            view,
            config,
            device,
        })
    }
}

impl Agent for NaturalPolicyGradient {
    type Policy = DiagGaussianActor;

    fn policy(&self) -> &DiagGaussianActor {
        &self.actor
    }

    fn var_map(&self) -> &VarMap {
        &self.varmap
    }

    fn learn(&mut self, rollouts: Vec<RolloutBuffer>) -> Result<StepOutcome> {
        let batch = TrajectoryBatch::from_rollouts(&rollouts, self.config.gamma, &self.device)?;
        let logp_old = LogpOld(self.actor.log_probs(&batch.states, &batch.actions)?.detach());

        let objective = surrogate_objective(
            &self.actor,
            &batch.states,
            &batch.actions,
            &batch.returns,
            &logp_old,
        )?;
        let objective_0 = objective.to_scalar::<f32>()? as f64;
        let grad = self.view.flatten_grads(&objective.backward()?)?;

        let fvp = FisherVectorProduct::new(
            &self.actor,
            &self.view,
            &batch.states,
            self.config.damping,
            self.config.fd_eps,
        )?;
        let Some(direction) = conjugate_gradient(|p| fvp.apply(p), &grad, self.config.cg_iterations)?
        else {
            return Ok(StepOutcome::Skipped {
                reason: "conjugate gradient hit non-positive curvature".to_string(),
            });
        };

        match &self.config.step_rule {
            StepRule::FixedScale { scale } => {
                let theta = self.view.flatten()?;
                self.view.unflatten_into(&(&theta + &(&direction * *scale)?)?)?;
                Ok(StepOutcome::Updated)
            }
            StepRule::TrustRegion(params) => {
                let fx = fvp.apply(&direction)?;
                let shs = 0.5 * dot(&direction, &fx)?;
                if shs <= 0.0 {
                    warn!(shs, "non-positive curvature along the candidate direction");
                    return Ok(StepOutcome::Skipped {
                        reason: format!("non-positive curvature along the step (sHs = {shs:.3e})"),
                    });
                }
                let step_size = (2.0 * params.max_kl / shs).sqrt();
                let maximal_step = (&direction * step_size)?;
                let expected_improve = dot(&grad, &maximal_step)?;
                let snapshot = self.view.flatten()?;

                let actor = &self.actor;
                let result = backtracking_line_search(
                    &self.view,
                    &snapshot,
                    &maximal_step,
                    expected_improve,
                    objective_0,
                    params,
                    || {
                        let objective = surrogate_objective(
                            actor,
                            &batch.states,
                            &batch.actions,
                            &batch.returns,
                            &logp_old,
                        )?;
                        let kl = kl_divergence(
                            fvp.snapshot_means(),
                            actor.log_std(),
                            &actor.mean(&batch.states)?,
                            actor.log_std(),
                        )?;
                        Ok((
                            objective.to_scalar::<f32>()? as f64,
                            kl.to_scalar::<f32>()? as f64,
                        ))
                    },
                )?;
                match result {
                    SearchResult::Accepted {
                        scale,
                        kl,
                        improve_ratio,
                        backtracks,
                    } => {
                        debug!(scale, kl, improve_ratio, backtracks, "trust-region step accepted");
                        Ok(StepOutcome::Updated)
                    }
                    SearchResult::Reverted => Ok(StepOutcome::Reverted),
                }
            }
        }
    }
}
