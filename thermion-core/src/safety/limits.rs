//! Over-temperature cutoff
//!
//! Forces a channel's output off for any period in which its reading is at
//! or above the configured ceiling. Not latched: heating resumes once the
//! reading drops back.

use crate::channel::HeaterChannel;

/// Per-channel maximum temperature guard
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OverTemperatureGuard {
    max_celsius: Option<f32>,
}

impl OverTemperatureGuard {
    /// Create a guard; `None` disables it
    pub const fn new(max_celsius: Option<f32>) -> Self {
        Self { max_celsius }
    }

    /// Configured ceiling
    pub fn max_celsius(&self) -> Option<f32> {
        self.max_celsius
    }

    /// Check if the channel's reading is at or above the ceiling
    pub fn exceeded(&self, channel: &HeaterChannel) -> bool {
        match self.max_celsius {
            Some(max) => channel.current_celsius() >= max,
            None => false,
        }
    }
}
