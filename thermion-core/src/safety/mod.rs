//! Safety supervision
//!
//! Runaway detection (latched, disables the channel) and an over-temperature
//! cutoff (per period, not latched).

pub mod limits;
pub mod runaway;

pub use limits::OverTemperatureGuard;
pub use runaway::{RunawaySupervisor, Verdict, WatchConfig};
