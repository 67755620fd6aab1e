pub mod pendulum;
pub mod point_target;

pub use pendulum::Pendulum;
pub use point_target::PointTarget;
