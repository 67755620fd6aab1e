pub mod ddpg;
pub mod natural_gradient;
