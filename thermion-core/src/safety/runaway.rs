//! Runaway watchdog
//!
//! When a channel is given a target well above its reading, the supervisor
//! records the reading and starts a deadline. If the reading has not risen
//! by `min_rise_raw` before the deadline, the heater, sensor or switching
//! path is assumed broken and the channel is disabled. Only an explicit
//! re-arm clears the trip.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::channel::{HeaterChannel, WatchState};

/// Runaway watch configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct WatchConfig {
    /// Time allowed for the reading to start rising (ms)
    pub period_ms: u32,
    /// Raw counts the reading must rise by to count as progress
    pub min_rise_raw: u16,
    /// Target must exceed the reading by more than this to start a watch
    pub noise_margin_raw: u16,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            period_ms: 20_000,
            min_rise_raw: 16,  // one ADC count at 16x oversampling
            noise_margin_raw: 32,
        }
    }
}

/// Result of a supervisor check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// Nothing to report
    Ok,
    /// The channel was disabled by this check
    Tripped,
}

/// Runaway supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunawaySupervisor {
    config: WatchConfig,
}

impl RunawaySupervisor {
    /// Create a supervisor
    pub const fn new(config: WatchConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Run one supervision step for a channel
    ///
    /// Returns [`Verdict::Tripped`] only on the check that disables the
    /// channel; afterwards the channel stays disabled and checks return
    /// [`Verdict::Ok`].
    pub fn check(&self, channel: &mut HeaterChannel, now_ms: u32) -> Verdict {
        if !channel.is_enabled() {
            return Verdict::Ok;
        }

        if channel.target_changed {
            channel.target_changed = false;
            channel.watch = WatchState::default();
            self.arm_if_heating(channel, now_ms);
        }

        if !channel.watch.armed {
            return Verdict::Ok;
        }

        let table = channel.table();
        let progress = table.heating_progress(channel.watch.baseline_raw, channel.current_raw());

        if !channel.is_heating() || progress >= i32::from(self.config.min_rise_raw) {
            // Healthy rise, or nothing left to heat towards
            channel.watch = WatchState::default();
            return Verdict::Ok;
        }

        if deadline_reached(now_ms, channel.watch.deadline_ms) {
            channel.mark_tripped();
            return Verdict::Tripped;
        }

        Verdict::Ok
    }

    fn arm_if_heating(&self, channel: &mut HeaterChannel, now_ms: u32) {
        let Some(target) = channel.target_raw() else {
            return;
        };
        let current = channel.current_raw();
        let gap = channel.table().heating_progress(current, target);

        if gap > i32::from(self.config.noise_margin_raw) {
            channel.watch = WatchState {
                armed: true,
                deadline_ms: now_ms.wrapping_add(self.config.period_ms),
                baseline_raw: current,
            };
        }
    }
}

/// Wrapping-safe `now >= deadline` for a millisecond clock
fn deadline_reached(now_ms: u32, deadline_ms: u32) -> bool {
    (now_ms.wrapping_sub(deadline_ms) as i32) >= 0
}
