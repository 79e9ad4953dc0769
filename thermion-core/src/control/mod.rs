//! Heater regulators
//!
//! Each channel runs either a PID regulator or a bang-bang regulator,
//! selected from configuration when the manager is built.

pub mod bang_bang;
pub mod pid;

pub use bang_bang::BangBang;
pub use pid::{PidGains, PidRegulator};

use crate::channel::HeaterChannel;

/// Full-power actuation level
pub const ACTUATION_MAX: u8 = 255;

/// Per-period inputs shared by all regulators
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInput {
    /// Time of this period (ms)
    pub now_ms: u32,
    /// Time since the previous period (s)
    pub elapsed_s: f32,
    /// Extrusion rate fed to the feed-forward term
    pub extrusion_rate: f32,
}

/// Regulator selected for a channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Regulator {
    /// PID control
    Pid(PidRegulator),
    /// On/off control
    BangBang(BangBang),
}

impl Regulator {
    /// Compute the actuation level for this period
    pub fn step(&self, channel: &mut HeaterChannel, input: &StepInput) -> u8 {
        match self {
            Regulator::Pid(pid) => pid.step(channel, input.elapsed_s, input.extrusion_rate),
            Regulator::BangBang(bb) => bb.step(channel, input.now_ms),
        }
    }
}
