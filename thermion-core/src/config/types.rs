//! Configuration type definitions
//!
//! These types describe the thermal configuration supplied by the loader at
//! startup. The manager validates them once and treats them as immutable
//! for the rest of the session.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationSet;
use crate::channel::{ChannelId, CHANNEL_COUNT};
use crate::control::{PidGains, ACTUATION_MAX};
use crate::safety::WatchConfig;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Control period must be non-zero
    InvalidPeriod,
    /// Runaway watch period must be non-zero
    InvalidWatchPeriod,
    /// Gains must be finite and non-negative
    InvalidGains(ChannelId),
    /// Channel power ceiling is zero
    ZeroPower(ChannelId),
    /// Early-cutoff offset must be finite and non-negative
    InvalidCutoffOffset(ChannelId),
    /// Derivative smoothing must be in `0.0..1.0`
    InvalidSmoothing(ChannelId),
    /// Maximum temperature must be finite
    InvalidMaxTemp(ChannelId),
    /// Auto-shutdown threshold must be finite
    InvalidShutdownThreshold,
}

/// Optional firmware capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Capabilities {
    /// PID control; when off every channel runs bang-bang
    pub pid: bool,
    /// Extrusion-rate feed-forward on hotends
    pub extrusion_rate: bool,
    /// Idle power-saving shutdown of hotends
    pub auto_shutdown: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            pid: true,
            extrusion_rate: false,
            auto_shutdown: false,
        }
    }
}

/// Regulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ControlMode {
    /// PID regulation
    #[default]
    Pid,
    /// On/off regulation
    BangBang,
}

/// Recovery policy after a runaway trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum RearmPolicy {
    /// An explicit re-arm request restores the channel
    #[default]
    Manual,
    /// Only a power cycle restores the channel
    PowerCycle,
}

/// Per-channel configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ChannelConfig {
    /// Regulation mode
    pub control: ControlMode,
    /// PID gains (used in PID mode)
    pub gains: PidGains,
    /// Power ceiling (0-255)
    pub max_power: u8,
    /// Early-cutoff offset below the target (°C)
    pub early_cutoff_offset_c: f32,
    /// Output is forced off at or above this temperature (°C)
    pub max_temp_c: Option<f32>,
    /// Minimum time between bang-bang decisions (ms)
    pub bang_bang_interval_ms: u32,
    /// Derivative smoothing weight (0 = none)
    pub derivative_smoothing: f32,
}

impl ChannelConfig {
    /// Hotend defaults: PID, 1°C early finish, 275°C ceiling
    pub fn hotend() -> Self {
        Self {
            control: ControlMode::Pid,
            gains: PidGains::default(),
            max_power: ACTUATION_MAX,
            early_cutoff_offset_c: 1.0,
            max_temp_c: Some(275.0),
            bang_bang_interval_ms: 0,
            derivative_smoothing: 0.95,
        }
    }

    /// Bed defaults: bang-bang every 5s, 150°C ceiling
    pub fn bed() -> Self {
        Self {
            control: ControlMode::BangBang,
            gains: PidGains::default(),
            max_power: ACTUATION_MAX,
            early_cutoff_offset_c: 0.0,
            max_temp_c: Some(150.0),
            bang_bang_interval_ms: 5000,
            derivative_smoothing: 0.0,
        }
    }

    fn validate(&self, id: ChannelId) -> Result<(), ConfigError> {
        if !self.gains.is_valid() {
            return Err(ConfigError::InvalidGains(id));
        }
        if self.max_power == 0 {
            return Err(ConfigError::ZeroPower(id));
        }
        if !(self.early_cutoff_offset_c.is_finite() && self.early_cutoff_offset_c >= 0.0) {
            return Err(ConfigError::InvalidCutoffOffset(id));
        }
        if !(0.0..1.0).contains(&self.derivative_smoothing) {
            return Err(ConfigError::InvalidSmoothing(id));
        }
        if matches!(self.max_temp_c, Some(max) if !max.is_finite()) {
            return Err(ConfigError::InvalidMaxTemp(id));
        }
        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::hotend()
    }
}

/// Complete thermal configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ThermalConfig {
    /// Enabled capabilities
    pub capabilities: Capabilities,
    /// Channel settings, indexed by [`ChannelId::index`]
    pub channels: [ChannelConfig; CHANNEL_COUNT],
    /// Calibration tables per sensor class
    pub calibration: CalibrationSet,
    /// Runaway watch settings
    pub watch: WatchConfig,
    /// Recovery policy after a runaway trip
    pub rearm: RearmPolicy,
    /// Nominal control period (ms), used for the first step
    pub period_ms: u32,
    /// Hotend targets above this are dropped by auto-shutdown (°C)
    pub auto_shutdown_min_c: f32,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::default(),
            channels: [
                ChannelConfig::hotend(),
                ChannelConfig::hotend(),
                ChannelConfig::bed(),
            ],
            calibration: CalibrationSet::default(),
            watch: WatchConfig::default(),
            rearm: RearmPolicy::default(),
            period_ms: 50,
            auto_shutdown_min_c: 210.0,
        }
    }
}

impl ThermalConfig {
    /// Settings for one channel
    pub fn channel(&self, id: ChannelId) -> &ChannelConfig {
        &self.channels[id.index()]
    }

    /// Mutable settings for one channel
    pub fn channel_mut(&mut self, id: ChannelId) -> &mut ChannelConfig {
        &mut self.channels[id.index()]
    }

    /// Check the configuration for values the control loop cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        if self.watch.period_ms == 0 {
            return Err(ConfigError::InvalidWatchPeriod);
        }
        if !self.auto_shutdown_min_c.is_finite() {
            return Err(ConfigError::InvalidShutdownThreshold);
        }
        for id in ChannelId::ALL {
            self.channel(id).validate(id)?;
        }
        Ok(())
    }
}
