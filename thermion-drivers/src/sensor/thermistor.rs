//! Oversampled thermistor input
//!
//! Thermistor on a pull-up to the ADC reference:
//! VCC -- pullup -- ADC_PIN -- NTC -- GND
//!
//! The sampling context calls [`ThermistorInput::sample`] once per tick.
//! Every [`OVERSAMPLE`] reads the sum is published as one raw sample, which
//! is the domain the compiled-in calibration tables are written in. The
//! control loop only ever sees the last published sample.

use thermion_core::calibration::Raw;
use thermion_core::traits::{RawSensor, SensorError};

/// ADC reads summed into one published sample
pub const OVERSAMPLE: u16 = 16;

/// Full scale of a 10-bit converter
pub const ADC_MAX_10BIT: u16 = 1023;

/// Reads within this many counts of either rail are treated as wiring faults
const RAIL_MARGIN: u16 = 10;

/// ADC reading trait for platform abstraction
pub trait AdcReader {
    /// Read one conversion (0..=adc_max)
    #[allow(clippy::result_unit_err)]
    fn read(&mut self) -> Result<u16, ()>;
}

/// Oversampling thermistor input
pub struct ThermistorInput<ADC> {
    adc: ADC,
    /// ADC full scale
    adc_max: u16,
    accumulator: u32,
    count: u16,
    conversion_failed: bool,
    latest: Result<Raw, SensorError>,
}

impl<ADC: AdcReader> ThermistorInput<ADC> {
    /// Create an input on a 10-bit converter
    pub fn new(adc: ADC) -> Self {
        Self::with_resolution(adc, ADC_MAX_10BIT)
    }

    /// Create an input with a given ADC full scale
    ///
    /// Full scales above 4095 would overflow the raw domain and are capped.
    /// Full scales too small to leave room between the rail margins are
    /// raised to the smallest usable value.
    pub fn with_resolution(adc: ADC, adc_max: u16) -> Self {
        Self {
            adc,
            adc_max: adc_max.clamp(2 * RAIL_MARGIN, 4095),
            accumulator: 0,
            count: 0,
            conversion_failed: false,
            latest: Err(SensorError::NotSampled),
        }
    }

    /// Take one ADC read
    ///
    /// Returns true when this read completed a sample and a new value was
    /// published.
    pub fn sample(&mut self) -> bool {
        match self.adc.read() {
            Ok(value) => self.accumulator += u32::from(value.min(self.adc_max)),
            Err(()) => self.conversion_failed = true,
        }
        self.count += 1;

        if self.count < OVERSAMPLE {
            return false;
        }

        self.latest = if self.conversion_failed {
            Err(SensorError::ConversionError)
        } else {
            self.classify(self.accumulator)
        };

        #[cfg(feature = "defmt")]
        if let Err(err) = self.latest {
            defmt::trace!("thermistor sample rejected: {}", err);
        }

        self.accumulator = 0;
        self.count = 0;
        self.conversion_failed = false;
        true
    }

    /// Last published sample
    pub fn latest(&self) -> Result<Raw, SensorError> {
        self.latest
    }

    /// Check a summed sample against the rails
    fn classify(&self, sum: u32) -> Result<Raw, SensorError> {
        let open_at = u32::from(self.adc_max.saturating_sub(RAIL_MARGIN)) * u32::from(OVERSAMPLE);
        let short_below = u32::from(RAIL_MARGIN) * u32::from(OVERSAMPLE);

        // Open thermistor leaves the pin pulled up to the rail
        if sum >= open_at {
            return Err(SensorError::OpenCircuit);
        }
        if sum < short_below {
            return Err(SensorError::ShortCircuit);
        }

        Raw::try_from(sum).map_err(|_| SensorError::ConversionError)
    }
}

impl<ADC: AdcReader> RawSensor for ThermistorInput<ADC> {
    fn read_raw(&mut self) -> Result<Raw, SensorError> {
        self.latest
    }
}

/// Fixed ADC for testing
#[cfg(test)]
pub struct DummyAdc(pub Result<u16, ()>);

#[cfg(test)]
impl AdcReader for DummyAdc {
    fn read(&mut self) -> Result<u16, ()> {
        self.0
    }
}
