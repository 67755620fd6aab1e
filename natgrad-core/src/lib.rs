pub mod agents;
pub mod checkpoint;
pub mod config;
pub mod distributions;
pub mod env;
pub mod flat;
pub mod net;
pub mod off_policy_algorithm;
pub mod on_policy_algorithm;
pub mod telemetry;
pub mod tensors;
pub mod utils;

use candle_core::Result;

pub trait Algorithm {
    fn train(&mut self) -> Result<()>;
}
