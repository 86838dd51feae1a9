/// Pendulum swing-up, continuous torque
pub mod pendulum;

pub use pendulum::Pendulum;
