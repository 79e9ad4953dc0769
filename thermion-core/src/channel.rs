//! Heater channel state
//!
//! One [`HeaterChannel`] exists per physical heater. It owns the raw
//! readings and setpoints of that heater together with the calibration
//! table of its sensor class, so temperatures, targets and the early-cutoff
//! threshold are always derived from the same table.

use crate::calibration::{CalibrationTable, Raw};

/// Number of heater channels
pub const CHANNEL_COUNT: usize = 3;

/// Heater channel identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelId {
    /// First extruder hotend
    Hotend0,
    /// Second extruder hotend
    Hotend1,
    /// Heated bed
    Bed,
}

impl ChannelId {
    /// All channels in control-loop order
    pub const ALL: [ChannelId; CHANNEL_COUNT] =
        [ChannelId::Hotend0, ChannelId::Hotend1, ChannelId::Bed];

    /// Slot index of this channel
    pub const fn index(self) -> usize {
        match self {
            ChannelId::Hotend0 => 0,
            ChannelId::Hotend1 => 1,
            ChannelId::Bed => 2,
        }
    }

    /// Hotend channel for an extruder index
    pub const fn hotend(extruder: u8) -> Option<ChannelId> {
        match extruder {
            0 => Some(ChannelId::Hotend0),
            1 => Some(ChannelId::Hotend1),
            _ => None,
        }
    }

    /// Check if this channel heats an extruder
    pub const fn is_hotend(self) -> bool {
        matches!(self, ChannelId::Hotend0 | ChannelId::Hotend1)
    }

    /// Sensor class, which selects the calibration table
    pub const fn sensor_class(self) -> SensorClass {
        match self {
            ChannelId::Hotend0 | ChannelId::Hotend1 => SensorClass::Hotend,
            ChannelId::Bed => SensorClass::Bed,
        }
    }
}

/// Sensor class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorClass {
    /// Hotend-type sensor
    Hotend,
    /// Bed-type sensor
    Bed,
}

/// Regulator state persisted across control periods
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidState {
    /// Integral accumulator, clamped to `[0, max_power]`
    pub integral: f32,
    /// Error of the previous period (°C)
    pub prev_error: f32,
    /// Measurement of the previous period (°C)
    pub prev_measurement: Option<f32>,
    /// Smoothed derivative term
    pub derivative: f32,
}

impl PidState {
    /// Clear all regulator history
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Runaway watch state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WatchState {
    /// Watch in progress
    pub armed: bool,
    /// Absolute time the rise must be seen by (ms)
    pub deadline_ms: u32,
    /// Reading captured when the watch started
    pub baseline_raw: Raw,
}

/// Per-heater mutable state
#[derive(Debug, Clone)]
pub struct HeaterChannel {
    id: ChannelId,
    table: CalibrationTable,
    early_cutoff_offset_c: f32,
    current_raw: Raw,
    target_raw: Option<Raw>,
    early_cutoff_raw: Option<Raw>,
    enabled: bool,
    tripped: bool,
    actuation: u8,
    pub(crate) pid: PidState,
    pub(crate) watch: WatchState,
    /// Set by a target change until the supervisor has looked at it
    pub(crate) target_changed: bool,
    /// Last time a bang-bang decision was taken
    pub(crate) last_decision_ms: Option<u32>,
}

impl HeaterChannel {
    /// Create an enabled channel with its target off
    ///
    /// The reading starts at the coldest edge of the table until the first
    /// sample arrives.
    pub fn new(id: ChannelId, table: CalibrationTable, early_cutoff_offset_c: f32) -> Self {
        let current_raw = table.coldest_raw();
        Self {
            id,
            table,
            early_cutoff_offset_c,
            current_raw,
            target_raw: None,
            early_cutoff_raw: None,
            enabled: true,
            tripped: false,
            actuation: 0,
            pid: PidState::default(),
            watch: WatchState::default(),
            target_changed: false,
            last_decision_ms: None,
        }
    }

    /// Channel identity
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Calibration table of this channel's sensor class
    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    /// Latest raw reading
    pub fn current_raw(&self) -> Raw {
        self.current_raw
    }

    /// Raw setpoint, `None` when off
    pub fn target_raw(&self) -> Option<Raw> {
        self.target_raw
    }

    /// Raw early-cutoff threshold, `None` when off
    pub fn early_cutoff_raw(&self) -> Option<Raw> {
        self.early_cutoff_raw
    }

    /// Check if actuation is permitted
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check if the runaway supervisor disabled this channel
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Last commanded actuation level
    pub fn actuation(&self) -> u8 {
        self.actuation
    }

    /// Regulator state
    pub fn pid_state(&self) -> &PidState {
        &self.pid
    }

    /// Runaway watch state
    pub fn watch_state(&self) -> &WatchState {
        &self.watch
    }

    /// Current temperature (°C)
    pub fn current_celsius(&self) -> f32 {
        self.table.raw_to_celsius(self.current_raw)
    }

    /// Target temperature (°C), `None` when off
    pub fn target_celsius(&self) -> Option<f32> {
        self.target_raw.map(|raw| self.table.raw_to_celsius(raw))
    }

    /// Check if the channel is still actively heating
    ///
    /// True while the reading is colder than the early-cutoff threshold,
    /// which is reached slightly before the real target.
    pub fn is_heating(&self) -> bool {
        match self.early_cutoff_raw {
            Some(cutoff) => self.enabled && self.table.is_hotter(cutoff, self.current_raw),
            None => false,
        }
    }

    /// Check if the reading is hotter than the target
    pub fn is_cooling(&self) -> bool {
        match self.target_raw {
            Some(target) => self.table.is_hotter(self.current_raw, target),
            None => false,
        }
    }

    /// Store a new raw sample
    pub fn update_raw(&mut self, raw: Raw) {
        self.current_raw = raw;
    }

    /// Set the target temperature
    ///
    /// Zero, negative or NaN turns the heater off. Other values are clamped
    /// into the table range. The integral accumulator is reset so wind-up
    /// from the old setpoint is not carried over.
    ///
    /// Ignored while the channel is disabled.
    pub fn set_target(&mut self, celsius: f32) {
        if !self.enabled {
            return;
        }

        if celsius > 0.0 {
            let (min, max) = self.table.celsius_range();
            let celsius = celsius.clamp(min, max);
            self.target_raw = Some(self.table.celsius_to_raw(celsius));
            self.early_cutoff_raw =
                Some(self.table.celsius_to_raw(celsius - self.early_cutoff_offset_c));
        } else {
            self.target_raw = None;
            self.early_cutoff_raw = None;
        }

        self.pid.integral = 0.0;
        self.target_changed = true;
    }

    /// Turn the target off if it is above an idle threshold
    ///
    /// Returns true if the target was turned off.
    ///
    /// The comparison is made in the raw domain so a target set exactly at
    /// the threshold is never shut down.
    pub fn auto_shutdown_if_idle(&mut self, min_celsius: f32) -> bool {
        let threshold = self.table.celsius_to_raw(min_celsius);
        match self.target_raw {
            Some(target) if self.table.is_hotter(target, threshold) => {
                self.set_target(0.0);
                true
            }
            _ => false,
        }
    }

    /// Disable actuation and clear the target
    pub fn disable(&mut self) {
        self.enabled = false;
        self.target_raw = None;
        self.early_cutoff_raw = None;
        self.pid.reset();
        self.watch = WatchState::default();
        self.target_changed = false;
        self.last_decision_ms = None;
        self.actuation = 0;
    }

    /// Permit actuation again after a disable, with the target off
    pub fn rearm(&mut self) {
        self.disable();
        self.enabled = true;
        self.tripped = false;
    }

    pub(crate) fn mark_tripped(&mut self) {
        self.disable();
        self.tripped = true;
    }

    pub(crate) fn set_actuation(&mut self, level: u8) {
        self.actuation = if self.enabled { level } else { 0 };
    }
}
