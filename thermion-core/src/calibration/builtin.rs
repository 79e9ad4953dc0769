//! Compiled-in calibration tables
//!
//! Both tables are in the native ADC domain of a 10-bit converter with 16x
//! oversampling (0..=16368), thermistor on a 4.7k pull-up. Raw falls as
//! temperature rises.

use super::table::{CalibrationTable, Raw};

/// 100k NTC (beta 4066), typical hotend thermistor, 0-300°C
pub const HOTEND_100K: &[(Raw, f32)] = &[
    (486, 300.0),
    (623, 280.0),
    (811, 260.0),
    (1074, 240.0),
    (1445, 220.0),
    (1975, 200.0),
    (2733, 180.0),
    (3810, 160.0),
    (5293, 140.0),
    (7216, 120.0),
    (9469, 100.0),
    (11749, 80.0),
    (13675, 60.0),
    (15012, 40.0),
    (15780, 20.0),
    (16150, 0.0),
];

/// 10k NTC (beta 3950), typical heated bed thermistor, 0-150°C
pub const BED_10K: &[(Raw, f32)] = &[
    (667, 150.0),
    (828, 140.0),
    (1035, 130.0),
    (1305, 120.0),
    (1656, 110.0),
    (2115, 100.0),
    (2712, 90.0),
    (3483, 80.0),
    (4459, 70.0),
    (5663, 60.0),
    (7086, 50.0),
    (8676, 40.0),
    (10328, 30.0),
    (11905, 20.0),
    (13275, 10.0),
    (14360, 0.0),
];

/// Default hotend table
pub fn hotend_100k() -> CalibrationTable {
    CalibrationTable::from_trusted(HOTEND_100K)
}

/// Default bed table
pub fn bed_10k() -> CalibrationTable {
    CalibrationTable::from_trusted(BED_10K)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Slope;

    #[test]
    fn test_builtin_tables_validate() {
        assert_eq!(CalibrationTable::new(HOTEND_100K).unwrap(), hotend_100k());
        assert_eq!(CalibrationTable::new(BED_10K).unwrap(), bed_10k());
    }

    #[test]
    fn test_builtin_ranges() {
        let hotend = hotend_100k();
        assert_eq!(hotend.slope(), Slope::Falling);
        assert_eq!(hotend.celsius_range(), (0.0, 300.0));

        let bed = bed_10k();
        assert_eq!(bed.slope(), Slope::Falling);
        assert_eq!(bed.celsius_range(), (0.0, 150.0));
    }

    #[test]
    fn test_tables_are_distinct() {
        // Same reading means very different temperatures per sensor class
        let raw = 5000;
        let hotend = hotend_100k().raw_to_celsius(raw);
        let bed = bed_10k().raw_to_celsius(raw);
        assert!(hotend > 140.0 && hotend < 160.0);
        assert!(bed > 60.0 && bed < 70.0);
    }
}
