//! Sensor calibration
//!
//! One table per sensor class. A channel only ever converts through the
//! table of its own class.

pub mod builtin;
pub mod table;

pub use table::{Breakpoint, CalibrationError, CalibrationTable, Raw, Slope, MAX_BREAKPOINTS};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::channel::SensorClass;

/// Calibration tables for every sensor class
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct CalibrationSet {
    /// Hotend-type sensor table
    pub hotend: CalibrationTable,
    /// Bed-type sensor table
    pub bed: CalibrationTable,
}

impl CalibrationSet {
    /// Table for a sensor class
    pub fn table(&self, class: SensorClass) -> &CalibrationTable {
        match class {
            SensorClass::Hotend => &self.hotend,
            SensorClass::Bed => &self.bed,
        }
    }
}

impl Default for CalibrationSet {
    fn default() -> Self {
        Self {
            hotend: builtin::hotend_100k(),
            bed: builtin::bed_10k(),
        }
    }
}
