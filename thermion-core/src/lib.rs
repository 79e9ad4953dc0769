//! Board-agnostic heater control core
//!
//! This crate contains all thermal control logic that does not depend on
//! specific hardware implementations:
//!
//! - Calibration tables (raw sensor counts to °C and back)
//! - Per-heater channel state
//! - PID and bang-bang regulators
//! - Runaway watchdog and over-temperature cutoff
//! - Periodic manager driving every channel
//! - Configuration types and persisted gains
//! - Sensor and heater boundary traits

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod calibration;
pub mod channel;
pub mod config;
pub mod control;
pub mod events;
pub mod manager;
pub mod safety;
pub mod traits;

pub use channel::{ChannelId, HeaterChannel};
pub use events::{Events, ThermalEvent};
pub use manager::{ChannelStatus, ControlError, TemperatureManager};
