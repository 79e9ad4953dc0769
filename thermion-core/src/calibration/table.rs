//! Piecewise-linear sensor calibration table
//!
//! Maps raw sensor readings to temperature and back by linear interpolation
//! between breakpoints. Readings outside the table are clamped to the
//! nearest edge rather than extrapolated.

use core::fmt;

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raw sensor reading in the ADC's native (oversampled) domain
pub type Raw = u16;

/// Maximum breakpoints per table
pub const MAX_BREAKPOINTS: usize = 32;

/// Table validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Fewer than two breakpoints
    TooFewPoints,
    /// More than [`MAX_BREAKPOINTS`] breakpoints
    TooManyPoints,
    /// Raw values must be strictly ascending
    RawNotAscending,
    /// Temperatures must be strictly monotonic
    NotMonotonic,
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::TooFewPoints => "calibration table needs at least two breakpoints",
            Self::TooManyPoints => "calibration table has too many breakpoints",
            Self::RawNotAscending => "calibration raw values must be strictly ascending",
            Self::NotMonotonic => "calibration temperatures must be strictly monotonic",
        };
        f.write_str(msg)
    }
}

/// A single (raw, temperature) breakpoint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Breakpoint {
    /// Raw sensor reading
    pub raw: Raw,
    /// Temperature at this reading (°C)
    pub celsius: f32,
}

/// Direction of temperature change as the raw reading increases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slope {
    /// Temperature rises with raw (thermocouple amplifiers, AD595)
    Rising,
    /// Temperature falls with raw (NTC thermistor on a pull-up divider)
    Falling,
}

/// Validated calibration table
///
/// Breakpoints are sorted by raw value and the temperature column is
/// strictly monotonic, so both directions of conversion have exactly one
/// bracketing segment for every in-range input.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(
        try_from = "Vec<Breakpoint, MAX_BREAKPOINTS>",
        into = "Vec<Breakpoint, MAX_BREAKPOINTS>"
    )
)]
pub struct CalibrationTable {
    points: Vec<Breakpoint, MAX_BREAKPOINTS>,
    slope: Slope,
}

impl CalibrationTable {
    /// Build a table from `(raw, celsius)` pairs
    pub fn new(points: &[(Raw, f32)]) -> Result<Self, CalibrationError> {
        let mut collected = Vec::new();
        for &(raw, celsius) in points {
            collected
                .push(Breakpoint { raw, celsius })
                .map_err(|_| CalibrationError::TooManyPoints)?;
        }
        Self::from_breakpoints(collected)
    }

    /// Build a table from already collected breakpoints
    pub fn from_breakpoints(
        points: Vec<Breakpoint, MAX_BREAKPOINTS>,
    ) -> Result<Self, CalibrationError> {
        if points.len() < 2 {
            return Err(CalibrationError::TooFewPoints);
        }

        let slope = if points[1].celsius > points[0].celsius {
            Slope::Rising
        } else {
            Slope::Falling
        };

        for pair in points.windows(2) {
            if pair[1].raw <= pair[0].raw {
                return Err(CalibrationError::RawNotAscending);
            }
            let monotonic = match slope {
                Slope::Rising => pair[1].celsius > pair[0].celsius,
                Slope::Falling => pair[1].celsius < pair[0].celsius,
            };
            // NaN fails both comparisons
            if !monotonic {
                return Err(CalibrationError::NotMonotonic);
            }
        }

        Ok(Self { points, slope })
    }

    /// Build one of the compiled-in tables
    ///
    /// Only used for tables whose validity is covered by tests.
    pub(crate) fn from_trusted(points: &[(Raw, f32)]) -> Self {
        let mut collected = Vec::new();
        for &(raw, celsius) in points.iter().take(MAX_BREAKPOINTS) {
            let _ = collected.push(Breakpoint { raw, celsius });
        }
        let slope = if collected.len() >= 2 && collected[1].celsius < collected[0].celsius {
            Slope::Falling
        } else {
            Slope::Rising
        };
        Self {
            points: collected,
            slope,
        }
    }

    /// Breakpoints in raw-ascending order
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.points
    }

    /// Temperature direction of the table
    pub fn slope(&self) -> Slope {
        self.slope
    }

    /// Representable temperature range `(min, max)` in °C
    pub fn celsius_range(&self) -> (f32, f32) {
        let first = self.points[0].celsius;
        let last = self.points[self.points.len() - 1].celsius;
        match self.slope {
            Slope::Rising => (first, last),
            Slope::Falling => (last, first),
        }
    }

    /// Raw reading of the coldest breakpoint
    pub fn coldest_raw(&self) -> Raw {
        match self.slope {
            Slope::Rising => self.points[0].raw,
            Slope::Falling => self.points[self.points.len() - 1].raw,
        }
    }

    /// Convert a raw reading to °C
    ///
    /// Readings outside the table clamp to the edge temperature.
    pub fn raw_to_celsius(&self, raw: Raw) -> f32 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        if raw <= first.raw {
            return first.celsius;
        }
        if raw >= last.raw {
            return last.celsius;
        }

        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if raw == lo.raw {
                return lo.celsius;
            }
            if raw < hi.raw {
                let fraction = f32::from(raw - lo.raw) / f32::from(hi.raw - lo.raw);
                return lo.celsius + (hi.celsius - lo.celsius) * fraction;
            }
        }

        last.celsius
    }

    /// Convert a temperature to the nearest raw reading
    ///
    /// Temperatures outside the table clamp to the edge reading; NaN maps
    /// to the coldest edge.
    pub fn celsius_to_raw(&self, celsius: f32) -> Raw {
        if celsius.is_nan() {
            return self.coldest_raw();
        }

        let (min, max) = self.celsius_range();
        let celsius = celsius.clamp(min, max);

        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if celsius == lo.celsius {
                return lo.raw;
            }
            if celsius == hi.celsius {
                return hi.raw;
            }
            let inside = match self.slope {
                Slope::Rising => celsius > lo.celsius && celsius < hi.celsius,
                Slope::Falling => celsius < lo.celsius && celsius > hi.celsius,
            };
            if inside {
                let fraction = (celsius - lo.celsius) / (hi.celsius - lo.celsius);
                let raw = f32::from(lo.raw) + f32::from(hi.raw - lo.raw) * fraction;
                return (raw + 0.5) as Raw;
            }
        }

        self.coldest_raw()
    }

    /// True if reading `a` is a hotter temperature than reading `b`
    pub fn is_hotter(&self, a: Raw, b: Raw) -> bool {
        match self.slope {
            Slope::Rising => a > b,
            Slope::Falling => a < b,
        }
    }

    /// Signed raw distance from `from` to `to`, positive when `to` is hotter
    pub fn heating_progress(&self, from: Raw, to: Raw) -> i32 {
        let delta = i32::from(to) - i32::from(from);
        match self.slope {
            Slope::Rising => delta,
            Slope::Falling => -delta,
        }
    }
}

impl TryFrom<Vec<Breakpoint, MAX_BREAKPOINTS>> for CalibrationTable {
    type Error = CalibrationError;

    fn try_from(points: Vec<Breakpoint, MAX_BREAKPOINTS>) -> Result<Self, Self::Error> {
        Self::from_breakpoints(points)
    }
}

impl From<CalibrationTable> for Vec<Breakpoint, MAX_BREAKPOINTS> {
    fn from(table: CalibrationTable) -> Self {
        table.points
    }
}
