//! Hardware abstraction traits
//!
//! These traits define the interface between the control core and the
//! sampling/actuation hardware.

pub mod heater;

pub use heater::{HeaterBank, HeaterOutput, RawSensor, SensorBank, SensorError};
