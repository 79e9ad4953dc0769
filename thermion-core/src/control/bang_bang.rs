//! Bang-bang heater regulator
//!
//! Full power while the reading is colder than the target, off otherwise.
//! Slow heaters (beds) re-evaluate only every `check_interval_ms` so the
//! switching element is not cycled every period.

use crate::channel::HeaterChannel;

/// Bang-bang regulator for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BangBang {
    max_power: u8,
    check_interval_ms: u32,
}

impl BangBang {
    /// Create a regulator; an interval of 0 decides every period
    pub const fn new(max_power: u8, check_interval_ms: u32) -> Self {
        Self {
            max_power,
            check_interval_ms,
        }
    }

    /// Compute the actuation level for this period
    ///
    /// Between decisions the previous level is held. A target change forces
    /// a fresh decision.
    pub fn step(&self, channel: &mut HeaterChannel, now_ms: u32) -> u8 {
        if let Some(last) = channel.last_decision_ms {
            if now_ms.wrapping_sub(last) < self.check_interval_ms && !channel.target_changed {
                return channel.actuation();
            }
        }
        channel.last_decision_ms = Some(now_ms);

        match channel.target_raw() {
            Some(target) if channel.table().is_hotter(target, channel.current_raw()) => {
                self.max_power
            }
            _ => 0,
        }
    }
}
