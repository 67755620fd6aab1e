use candle_core::Tensor;
use derive_more::{Deref, DerefMut, Display};

/// Per-transition discounted returns, `(batch,)`.
#[derive(Deref, DerefMut, Debug, Display)]
pub struct Returns(pub Tensor);

/// Behavior-policy log-densities frozen at collection parameters, `(batch,)`.
/// Detached: only the importance ratio's denominator, never a gradient path.
#[derive(Deref, DerefMut, Debug, Display)]
pub struct LogpOld(pub Tensor);
