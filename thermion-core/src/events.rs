//! Events reported by the control loop
//!
//! The periodic manager never fails; anything the operator or telemetry
//! layer needs to know about is returned as an event instead.

use heapless::Vec;

use crate::channel::{ChannelId, CHANNEL_COUNT};
use crate::traits::SensorError;

/// Maximum events produced by one control period
pub const MAX_EVENTS: usize = 2 * CHANNEL_COUNT;

/// Events of one control period
pub type Events = Vec<ThermalEvent, MAX_EVENTS>;

/// Reportable conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ThermalEvent {
    /// Runaway watchdog disabled the channel (terminal until re-arm)
    RunawayTripped(ChannelId),
    /// Sensor read failed; output forced off for this period
    SensorFault(ChannelId, SensorError),
    /// Reading at or above the channel ceiling; output forced off
    OverTemperature(ChannelId),
}

impl ThermalEvent {
    /// Channel the event refers to
    pub fn channel(&self) -> ChannelId {
        match self {
            ThermalEvent::RunawayTripped(id)
            | ThermalEvent::SensorFault(id, _)
            | ThermalEvent::OverTemperature(id) => *id,
        }
    }

    /// Check if the event leaves the channel disabled
    pub fn is_fatal(&self) -> bool {
        matches!(self, ThermalEvent::RunawayTripped(_))
    }
}
