//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the boundary traits
//! defined in thermion-core:
//!
//! - Thermistor input (oversampled ADC, open/short detection)
//! - Software PWM heater output on an `embedded-hal` pin

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod heater;
pub mod sensor;
