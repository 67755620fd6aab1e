pub mod rollout_buffer;
pub mod running_score;

use candle_core::{DType, Result, Tensor};

/// Dot product of two flat vectors, extracted as f64.
pub fn dot(a: &Tensor, b: &Tensor) -> Result<f64> {
    (a * b)?.sum_all()?.to_dtype(DType::F64)?.to_scalar::<f64>()
}
