//! Sensor input and heater output traits
//!
//! The control core never touches pins or converters directly. Sampling
//! hardware publishes raw readings through [`RawSensor`], and actuation is
//! handed to [`HeaterOutput`]. Both are read/written once per control
//! period from the same execution context, so no locking is involved.

use crate::calibration::Raw;
use crate::channel::{ChannelId, CHANNEL_COUNT};

/// Errors that can occur with temperature sensing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Sensor disconnected (open circuit)
    OpenCircuit,
    /// Sensor shorted to ground
    ShortCircuit,
    /// ADC conversion error
    ConversionError,
    /// No complete sample is available yet
    NotSampled,
}

/// Source of raw samples for one sensor
pub trait RawSensor {
    /// Latest raw sample in the ADC's native domain
    ///
    /// Takes `&mut self` because ADC reads typically require mutable access.
    fn read_raw(&mut self) -> Result<Raw, SensorError>;
}

/// Heater actuation for one channel
///
/// Levels run from 0 (off) to [`ACTUATION_MAX`](crate::control::ACTUATION_MAX).
pub trait HeaterOutput {
    /// Command a power level
    fn set_power(&mut self, level: u8);

    /// Currently commanded power level
    fn power(&self) -> u8;
}

/// Raw samples for every channel
pub trait SensorBank {
    /// Latest raw sample for a channel
    fn read_raw(&mut self, id: ChannelId) -> Result<Raw, SensorError>;
}

/// Heater outputs for every channel
pub trait HeaterBank {
    /// Command a power level on a channel
    fn set_power(&mut self, id: ChannelId, level: u8);
}

impl<S: RawSensor> SensorBank for [S; CHANNEL_COUNT] {
    fn read_raw(&mut self, id: ChannelId) -> Result<Raw, SensorError> {
        self[id.index()].read_raw()
    }
}

impl<H: HeaterOutput> HeaterBank for [H; CHANNEL_COUNT] {
    fn set_power(&mut self, id: ChannelId, level: u8) {
        self[id.index()].set_power(level);
    }
}
