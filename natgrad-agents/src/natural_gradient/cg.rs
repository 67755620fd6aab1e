use candle_core::{Result, Tensor};
use natgrad_core::utils::dot;
use tracing::warn;

/// Approximately solves `F x = b` given only the product operator `fvp`.
///
/// Runs a fixed iteration budget with no residual-tolerance early exit.
/// Returns `None` when the operator turns out non-positive along a search
/// direction, which leaves the step size undefined; callers treat that as a
/// recoverable fault and skip the update.
pub fn conjugate_gradient<F>(mut fvp: F, b: &Tensor, iterations: usize) -> Result<Option<Tensor>>
where
    F: FnMut(&Tensor) -> Result<Tensor>,
{
    let mut x = b.zeros_like()?;
    let mut r = b.clone();
    let mut p = b.clone();
    let mut rs = dot(&r, &r)?;
    for iteration in 0..iterations {
        let fp = fvp(&p)?;
        let pfp = dot(&p, &fp)?;
        if pfp <= 0.0 {
            warn!(iteration, pfp, "non-positive curvature in conjugate gradient");
            return Ok(None);
        }
        let alpha = rs / pfp;
        x = (&x + &(&p * alpha)?)?;
        r = (&r - &(&fp * alpha)?)?;
        let rs_new = dot(&r, &r)?;
        if rs_new == 0.0 {
            // the residual vanished exactly; another step would divide by zero
            return Ok(Some(x));
        }
        p = (&r + &(&p * (rs_new / rs))?)?;
        rs = rs_new;
    }
    Ok(Some(x))
}

#[cfg(test)]
mod test {
    use super::conjugate_gradient;
    use candle_core::{Device, Result, Tensor};

    /// A known symmetric positive-definite 2x2 system solved against its
    /// closed form: A = [[4, 1], [1, 3]], b = [1, 2], x = [1/11, 7/11].
    #[test]
    fn converges_to_the_closed_form_solution() -> Result<()> {
        let device = Device::Cpu;
        let apply = |p: &Tensor| -> Result<Tensor> {
            let p = p.to_vec1::<f32>()?;
            Tensor::from_slice(&[4. * p[0] + p[1], p[0] + 3. * p[1]], 2, &device)
        };
        let b = Tensor::from_slice(&[1.0f32, 2.0], 2, &device)?;
        let x = conjugate_gradient(apply, &b, 10)?.expect("spd operator");
        let x = x.to_vec1::<f32>()?;
        assert!((x[0] - 1. / 11.).abs() < 1e-4);
        assert!((x[1] - 7. / 11.).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn indefinite_operator_reports_no_solution() -> Result<()> {
        let device = Device::Cpu;
        let apply = |p: &Tensor| p * (-1.0);
        let b = Tensor::from_slice(&[1.0f32, 0.0], 2, &device)?;
        assert!(conjugate_gradient(apply, &b, 10)?.is_none());
        Ok(())
    }
}
