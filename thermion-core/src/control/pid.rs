//! PID heater regulator
//!
//! Floating-point PID in the temperature domain with:
//! - integral clamped to the output range (anti-windup)
//! - derivative on measurement, so setpoint changes do not kick
//! - optional derivative smoothing
//! - optional feed-forward term proportional to the extrusion rate

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::channel::HeaterChannel;

/// PID gains
///
/// `ki` is per second and `kd` is in seconds, so gains do not depend on the
/// control period.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct PidGains {
    /// Proportional gain (Kp)
    pub kp: f32,
    /// Integral gain (Ki)
    pub ki: f32,
    /// Derivative gain (Kd)
    pub kd: f32,
    /// Extrusion-rate feed-forward gain (Kc)
    pub kc: f32,
}

impl PidGains {
    /// Create gains without feed-forward
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd, kc: 0.0 }
    }

    /// Set the feed-forward gain
    pub const fn with_kc(mut self, kc: f32) -> Self {
        self.kc = kc;
        self
    }

    /// Check that every gain is finite and non-negative
    pub fn is_valid(&self) -> bool {
        [self.kp, self.ki, self.kd, self.kc]
            .iter()
            .all(|g| g.is_finite() && *g >= 0.0)
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::new(22.2, 1.08, 114.0).with_kc(1.0)
    }
}

/// PID regulator for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidRegulator {
    gains: PidGains,
    max_power: u8,
    /// Weight of the previous derivative, `0.0` disables smoothing
    smoothing: f32,
    feed_forward: bool,
}

impl PidRegulator {
    /// Create a regulator
    pub fn new(gains: PidGains, max_power: u8) -> Self {
        Self {
            gains,
            max_power,
            smoothing: 0.0,
            feed_forward: false,
        }
    }

    /// Smooth the derivative term with weight `smoothing` on the old value
    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Enable the extrusion-rate feed-forward term
    pub fn with_feed_forward(mut self, enabled: bool) -> Self {
        self.feed_forward = enabled;
        self
    }

    /// Gains in use
    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Output ceiling
    pub fn max_power(&self) -> u8 {
        self.max_power
    }

    /// Compute the actuation level for this period
    ///
    /// `elapsed_s` is the time since the previous step. With the target off
    /// the output is zero, but the measurement is still tracked so the
    /// derivative is valid once a target is set.
    pub fn step(&self, channel: &mut HeaterChannel, elapsed_s: f32, extrusion_rate: f32) -> u8 {
        let current = channel.current_celsius();
        let target = channel.target_celsius();
        let max = f32::from(self.max_power);
        let pid = &mut channel.pid;

        let Some(target) = target else {
            pid.prev_measurement = Some(current);
            pid.prev_error = 0.0;
            pid.derivative = 0.0;
            return 0;
        };

        let error = target - current;
        let p_term = self.gains.kp * error;

        if elapsed_s > 0.0 {
            let integral = pid.integral + self.gains.ki * error * elapsed_s;
            pid.integral = integral.clamp(0.0, max);

            if let Some(prev) = pid.prev_measurement {
                let raw_d = -self.gains.kd * (current - prev) / elapsed_s;
                pid.derivative = self.smoothing * pid.derivative + (1.0 - self.smoothing) * raw_d;
            }
        }

        pid.prev_measurement = Some(current);
        pid.prev_error = error;

        let ff_term = if self.feed_forward {
            self.gains.kc * extrusion_rate
        } else {
            0.0
        };

        let output = (p_term + pid.integral + pid.derivative + ff_term).clamp(0.0, max);

        // NaN casts to 0
        (output + 0.5) as u8
    }
}
