//! Software PWM heater output
//!
//! Drives a heater through a plain GPIO pin (directly or via SSR/MOSFET).
//! The control loop commands a level with [`HeaterOutput::set_power`]; a
//! fast periodic context calls [`SoftPwmHeater::tick`], which switches the
//! pin so that the on-time over one 256-tick cycle matches the level.

use embedded_hal::digital::OutputPin;
use thermion_core::traits::HeaterOutput;

/// Software PWM heater output
pub struct SoftPwmHeater<P> {
    pin: P,
    /// If true, heater ON = pin LOW
    inverted: bool,
    /// Commanded level (0 = off)
    level: u8,
    /// Position within the PWM cycle
    counter: u8,
    /// Current pin state (true = heater on)
    on: bool,
}

impl<P: OutputPin> SoftPwmHeater<P> {
    /// Create a new heater output, driving the pin off
    ///
    /// # Arguments
    /// - `pin`: The GPIO pin to control
    /// - `inverted`: If true, heater is ON when pin is LOW (for active-low SSRs)
    pub fn new(pin: P, inverted: bool) -> Result<Self, P::Error> {
        let mut heater = Self {
            pin,
            inverted,
            level: 0,
            counter: 0,
            on: true,
        };
        heater.drive(false)?;
        Ok(heater)
    }

    /// Create a new heater with active-high output
    pub fn new_active_high(pin: P) -> Result<Self, P::Error> {
        Self::new(pin, false)
    }

    /// Create a new heater with active-low output
    pub fn new_active_low(pin: P) -> Result<Self, P::Error> {
        Self::new(pin, true)
    }

    /// Advance the PWM cycle by one tick
    pub fn tick(&mut self) -> Result<(), P::Error> {
        self.counter = self.counter.wrapping_add(1);
        self.drive(self.level > self.counter)
    }

    /// Drop the level to zero and switch the pin off now
    pub fn force_off(&mut self) -> Result<(), P::Error> {
        self.level = 0;
        self.drive(false)
    }

    /// Check if the heater pin is currently on
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Release the pin
    pub fn release(self) -> P {
        self.pin
    }

    fn drive(&mut self, on: bool) -> Result<(), P::Error> {
        if on == self.on {
            return Ok(());
        }

        // Normal: on=true, inverted=false → high
        // Inverted: on=true, inverted=true → low
        if on != self.inverted {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.on = on;
        Ok(())
    }
}

impl<P: OutputPin> HeaterOutput for SoftPwmHeater<P> {
    fn set_power(&mut self, level: u8) {
        self.level = level;
    }

    fn power(&self) -> u8 {
        self.level
    }
}
