//! Heater output implementations

pub mod soft_pwm;

pub use soft_pwm::SoftPwmHeater;
