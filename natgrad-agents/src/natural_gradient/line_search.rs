use candle_core::{Result, Tensor};
use natgrad_core::flat::FlatView;
use tracing::debug;

/// Knobs for the trust-region backtracking search.
#[derive(Debug, Clone)]
pub struct BacktrackParams {
    /// Divergence budget a candidate must stay under.
    pub max_kl: f64,
    pub max_backtracks: usize,
    /// Minimum acceptable ratio of realized to expected improvement.
    pub accept_ratio: f64,
    /// Step-scale shrink factor between attempts.
    pub shrink: f64,
}

impl Default for BacktrackParams {
    fn default() -> Self {
        Self {
            max_kl: 1e-2,
            max_backtracks: 10,
            accept_ratio: 0.5,
            shrink: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    Accepted {
        scale: f64,
        kl: f64,
        improve_ratio: f64,
        backtracks: usize,
    },
    /// Every attempt failed; the snapshot is back in the live model.
    Reverted,
}

/// Writes scaled candidates along `maximal_step` into the live parameters
/// until both the divergence budget and the sufficient-improvement test
/// hold, shrinking the scale between attempts. Exhausting the budget
/// restores `snapshot` exactly.
///
/// `eval` scores whatever parameters are currently written into the model
/// and returns `(objective, kl_from_snapshot)`.
pub fn backtracking_line_search<F>(
    view: &FlatView,
    snapshot: &Tensor,
    maximal_step: &Tensor,
    expected_improve: f64,
    old_objective: f64,
    params: &BacktrackParams,
    mut eval: F,
) -> Result<SearchResult>
where
    F: FnMut() -> Result<(f64, f64)>,
{
    let mut t = 1.0;
    for attempt in 0..params.max_backtracks {
        let candidate = (snapshot + &(maximal_step * t)?)?;
        view.unflatten_into(&candidate)?;
        let (objective, kl) = eval()?;
        let improve_ratio = (objective - old_objective) / (t * expected_improve);
        debug!(attempt, objective, kl, improve_ratio, "line search attempt");
        if kl < params.max_kl && improve_ratio > params.accept_ratio {
            return Ok(SearchResult::Accepted {
                scale: t,
                kl,
                improve_ratio,
                backtracks: attempt,
            });
        }
        t *= params.shrink;
    }
    view.unflatten_into(snapshot)?;
    Ok(SearchResult::Reverted)
}

#[cfg(test)]
mod test {
    use super::{BacktrackParams, SearchResult, backtracking_line_search};
    use candle_core::{DType, Device, Result, Tensor};
    use candle_nn::{Init, VarMap};
    use natgrad_core::flat::FlatView;

    fn scalar_param(value: f64) -> Result<(VarMap, FlatView)> {
        let varmap = VarMap::new();
        varmap.get(1, "w", Init::Const(value), DType::F32, &Device::Cpu)?;
        let view = FlatView::from_varmap(&varmap);
        Ok((varmap, view))
    }

    #[test]
    fn improving_step_is_accepted_without_shrinking() -> Result<()> {
        let (_varmap, view) = scalar_param(1.0)?;
        let snapshot = view.flatten()?;
        let step = Tensor::from_slice(&[1.0f32], 1, &Device::Cpu)?;
        // objective tracks the parameter itself, so the full step improves
        // by exactly the expectation and the divergence stays at zero
        let result = backtracking_line_search(
            &view,
            &snapshot,
            &step,
            1.0,
            1.0,
            &BacktrackParams::default(),
            || {
                let w = view.flatten()?.to_vec1::<f32>()?[0] as f64;
                Ok((w, 0.0))
            },
        )?;
        match result {
            SearchResult::Accepted {
                scale, backtracks, ..
            } => {
                assert_eq!(scale, 1.0);
                assert_eq!(backtracks, 0);
            }
            SearchResult::Reverted => panic!("expected acceptance at the first attempt"),
        }
        assert_eq!(view.flatten()?.to_vec1::<f32>()?, vec![2.0]);
        Ok(())
    }

    #[test]
    fn exhausted_search_restores_the_snapshot_exactly() -> Result<()> {
        let (_varmap, view) = scalar_param(0.62584)?;
        let snapshot = view.flatten()?;
        let before = snapshot.to_vec1::<f32>()?;
        let step = Tensor::from_slice(&[1.0f32], 1, &Device::Cpu)?;
        // the objective never improves, so no attempt can be accepted
        let result = backtracking_line_search(
            &view,
            &snapshot,
            &step,
            1.0,
            5.0,
            &BacktrackParams::default(),
            || Ok((4.0, 0.0)),
        )?;
        assert_eq!(result, SearchResult::Reverted);
        assert_eq!(view.flatten()?.to_vec1::<f32>()?, before);
        Ok(())
    }

    #[test]
    fn kl_violations_force_backtracking() -> Result<()> {
        let (_varmap, view) = scalar_param(0.0)?;
        let snapshot = view.flatten()?;
        let step = Tensor::from_slice(&[1.0f32], 1, &Device::Cpu)?;
        // divergence grows with the square of the written parameter: the
        // full step blows the budget, half of it fits
        let params = BacktrackParams {
            max_kl: 0.3,
            ..Default::default()
        };
        let result = backtracking_line_search(&view, &snapshot, &step, 1.0, 0.0, &params, || {
            let w = view.flatten()?.to_vec1::<f32>()?[0] as f64;
            Ok((w, w * w))
        })?;
        match result {
            SearchResult::Accepted {
                scale, backtracks, ..
            } => {
                assert_eq!(scale, 0.5);
                assert_eq!(backtracks, 1);
            }
            SearchResult::Reverted => panic!("expected acceptance after one shrink"),
        }
        Ok(())
    }
}
