//! Periodic heater manager
//!
//! [`TemperatureManager`] owns every heater channel and is driven by an
//! external scheduler at a fixed short period. Each call to
//! [`TemperatureManager::manage_heaters`] reads all sensors, runs the
//! regulators and safety checks, and writes all outputs, in the fixed order
//! Hotend0, Hotend1, Bed. It never blocks and never fails: any channel in
//! doubt is driven off.

use crate::channel::{ChannelId, HeaterChannel, CHANNEL_COUNT};
use crate::config::{Capabilities, ChannelConfig, ConfigError, ControlMode, RearmPolicy, ThermalConfig};
use crate::control::{BangBang, PidRegulator, Regulator, StepInput};
use crate::events::{Events, ThermalEvent};
use crate::safety::{OverTemperatureGuard, RunawaySupervisor, Verdict};
use crate::traits::{HeaterBank, SensorBank};

/// Operator request errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// No hotend with this extruder index
    UnknownExtruder(u8),
    /// Channel is disabled and needs a re-arm first
    ChannelDisabled(ChannelId),
    /// Re-arm policy only allows recovery by power cycle
    RearmNotPermitted(ChannelId),
}

/// Snapshot of one channel for telemetry
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelStatus {
    /// Channel identity
    pub id: ChannelId,
    /// Current temperature (°C)
    pub current_c: f32,
    /// Target temperature (°C), `None` when off
    pub target_c: Option<f32>,
    /// Actively heating (below early cutoff)
    pub heating: bool,
    /// Hotter than target
    pub cooling: bool,
    /// Actuation permitted
    pub enabled: bool,
    /// Disabled by the runaway watchdog
    pub tripped: bool,
    /// Last commanded output level
    pub actuation: u8,
}

/// Channel with its regulator and guard
#[derive(Debug, Clone)]
struct Slot {
    channel: HeaterChannel,
    regulator: Regulator,
    guard: OverTemperatureGuard,
}

impl Slot {
    fn new(id: ChannelId, config: &ThermalConfig) -> Self {
        let channel_config = config.channel(id);
        let table = config.calibration.table(id.sensor_class()).clone();

        Self {
            channel: HeaterChannel::new(id, table, channel_config.early_cutoff_offset_c),
            regulator: select_regulator(id, channel_config, &config.capabilities),
            guard: OverTemperatureGuard::new(channel_config.max_temp_c),
        }
    }
}

fn select_regulator(id: ChannelId, config: &ChannelConfig, caps: &Capabilities) -> Regulator {
    match config.control {
        ControlMode::Pid if caps.pid => Regulator::Pid(
            PidRegulator::new(config.gains, config.max_power)
                .with_smoothing(config.derivative_smoothing)
                .with_feed_forward(caps.extrusion_rate && id.is_hotend()),
        ),
        _ => Regulator::BangBang(BangBang::new(config.max_power, config.bang_bang_interval_ms)),
    }
}

/// Owner of all heater channels
#[derive(Debug, Clone)]
pub struct TemperatureManager {
    slots: [Slot; CHANNEL_COUNT],
    supervisor: RunawaySupervisor,
    capabilities: Capabilities,
    rearm_policy: RearmPolicy,
    period_ms: u32,
    auto_shutdown_min_c: f32,
    extrusion_rate: f32,
    last_tick_ms: Option<u32>,
}

impl TemperatureManager {
    /// Validate the configuration and create all channels
    ///
    /// Channels start enabled with their targets off.
    pub fn new(config: &ThermalConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            slots: ChannelId::ALL.map(|id| Slot::new(id, config)),
            supervisor: RunawaySupervisor::new(config.watch),
            capabilities: config.capabilities,
            rearm_policy: config.rearm,
            period_ms: config.period_ms,
            auto_shutdown_min_c: config.auto_shutdown_min_c,
            extrusion_rate: 0.0,
            last_tick_ms: None,
        })
    }

    /// Run one control period
    ///
    /// All channels see the same `now_ms`. Outputs of disabled channels and
    /// of channels whose sensor failed or whose reading is over the ceiling
    /// are written as 0.
    pub fn manage_heaters<S, H>(&mut self, now_ms: u32, sensors: &mut S, heaters: &mut H) -> Events
    where
        S: SensorBank + ?Sized,
        H: HeaterBank + ?Sized,
    {
        let elapsed_ms = match self.last_tick_ms {
            Some(last) => now_ms.wrapping_sub(last),
            None => self.period_ms,
        };
        self.last_tick_ms = Some(now_ms);

        let mut events = Events::new();

        for id in ChannelId::ALL {
            let input = StepInput {
                now_ms,
                elapsed_s: elapsed_ms as f32 / 1000.0,
                extrusion_rate: if id.is_hotend() { self.extrusion_rate } else { 0.0 },
            };
            let slot = &mut self.slots[id.index()];

            let sample = sensors.read_raw(id);
            if let Ok(raw) = sample {
                slot.channel.update_raw(raw);
            }

            let mut level = match sample {
                Ok(_) if slot.channel.is_enabled() => slot.regulator.step(&mut slot.channel, &input),
                _ => 0,
            };

            match sample {
                Err(err) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("{}: sensor fault {}", id, err);
                    let _ = events.push(ThermalEvent::SensorFault(id, err));
                }
                Ok(_) if slot.guard.exceeded(&slot.channel) => {
                    level = 0;
                    let _ = events.push(ThermalEvent::OverTemperature(id));
                }
                Ok(_) => {}
            }

            if self.supervisor.check(&mut slot.channel, now_ms) == Verdict::Tripped {
                #[cfg(feature = "defmt")]
                defmt::warn!("{}: heating failed, runaway watchdog tripped", id);
                let _ = events.push(ThermalEvent::RunawayTripped(id));
            }

            slot.channel.set_actuation(level);
            heaters.set_power(id, slot.channel.actuation());
        }

        events
    }

    /// Set a channel's target temperature (°C)
    ///
    /// Out-of-range values are clamped; `0` turns the heater off.
    pub fn set_target(&mut self, id: ChannelId, celsius: f32) -> Result<(), ControlError> {
        let channel = &mut self.slots[id.index()].channel;
        if !channel.is_enabled() {
            return Err(ControlError::ChannelDisabled(id));
        }

        channel.set_target(celsius);
        #[cfg(feature = "defmt")]
        defmt::debug!("{}: target {}", id, channel.target_celsius());
        Ok(())
    }

    /// Set the target of an extruder's hotend (°C)
    pub fn set_target_hotend(&mut self, extruder: u8, celsius: f32) -> Result<(), ControlError> {
        let id = ChannelId::hotend(extruder).ok_or(ControlError::UnknownExtruder(extruder))?;
        self.set_target(id, celsius)
    }

    /// Set the bed target (°C)
    pub fn set_target_bed(&mut self, celsius: f32) -> Result<(), ControlError> {
        self.set_target(ChannelId::Bed, celsius)
    }

    /// Feed the current extrusion rate into the hotend feed-forward term
    ///
    /// Ignored unless the extrusion-rate capability is enabled.
    pub fn set_extrusion_rate(&mut self, rate: f32) {
        if self.capabilities.extrusion_rate && rate.is_finite() {
            self.extrusion_rate = rate;
        }
    }

    /// Turn every target off, leaving channels enabled
    pub fn all_off(&mut self) {
        for slot in &mut self.slots {
            slot.channel.set_target(0.0);
        }
    }

    /// Disable every channel until re-armed
    pub fn disable_all(&mut self) {
        for slot in &mut self.slots {
            slot.channel.disable();
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("all heaters disabled");
    }

    /// Drop hotend targets above the idle threshold
    ///
    /// Used when hotends are left heating with nothing consuming material.
    /// Returns true if any target was turned off. Does nothing unless the
    /// auto-shutdown capability is enabled.
    pub fn auto_shutdown(&mut self) -> bool {
        if !self.capabilities.auto_shutdown {
            return false;
        }

        let mut shut_down = false;
        for slot in self.slots.iter_mut().filter(|s| s.channel.id().is_hotend()) {
            if slot.channel.auto_shutdown_if_idle(self.auto_shutdown_min_c) {
                #[cfg(feature = "defmt")]
                defmt::info!("{}: idle auto-shutdown", slot.channel.id());
                shut_down = true;
            }
        }
        shut_down
    }

    /// Restore a disabled channel, with its target off
    ///
    /// Does nothing for a channel that is already enabled.
    pub fn rearm(&mut self, id: ChannelId) -> Result<(), ControlError> {
        let channel = &mut self.slots[id.index()].channel;
        if channel.is_enabled() {
            return Ok(());
        }
        if self.rearm_policy == RearmPolicy::PowerCycle {
            return Err(ControlError::RearmNotPermitted(id));
        }

        channel.rearm();
        #[cfg(feature = "defmt")]
        defmt::info!("{}: re-armed", id);
        Ok(())
    }

    /// Channel state
    pub fn channel(&self, id: ChannelId) -> &HeaterChannel {
        &self.slots[id.index()].channel
    }

    /// Regulator selected for a channel
    pub fn regulator(&self, id: ChannelId) -> &Regulator {
        &self.slots[id.index()].regulator
    }

    /// Telemetry snapshot of a channel
    pub fn status(&self, id: ChannelId) -> ChannelStatus {
        let channel = self.channel(id);
        ChannelStatus {
            id,
            current_c: channel.current_celsius(),
            target_c: channel.target_celsius(),
            heating: channel.is_heating(),
            cooling: channel.is_cooling(),
            enabled: channel.is_enabled(),
            tripped: channel.is_tripped(),
            actuation: channel.actuation(),
        }
    }

    /// Telemetry snapshot of every channel
    pub fn statuses(&self) -> [ChannelStatus; CHANNEL_COUNT] {
        ChannelId::ALL.map(|id| self.status(id))
    }

    /// Hotend temperature (°C)
    pub fn deg_hotend(&self, extruder: u8) -> Option<f32> {
        ChannelId::hotend(extruder).map(|id| self.channel(id).current_celsius())
    }

    /// Hotend target (°C), `None` when off or unknown
    pub fn deg_target_hotend(&self, extruder: u8) -> Option<f32> {
        ChannelId::hotend(extruder).and_then(|id| self.channel(id).target_celsius())
    }

    /// Bed temperature (°C)
    pub fn deg_bed(&self) -> f32 {
        self.channel(ChannelId::Bed).current_celsius()
    }

    /// Bed target (°C), `None` when off
    pub fn deg_target_bed(&self) -> Option<f32> {
        self.channel(ChannelId::Bed).target_celsius()
    }

    /// Check if a hotend is still heating towards its early cutoff
    pub fn is_heating_hotend(&self, extruder: u8) -> bool {
        ChannelId::hotend(extruder).is_some_and(|id| self.channel(id).is_heating())
    }

    /// Check if a hotend is hotter than its target
    pub fn is_cooling_hotend(&self, extruder: u8) -> bool {
        ChannelId::hotend(extruder).is_some_and(|id| self.channel(id).is_cooling())
    }

    /// Check if the bed is still heating
    pub fn is_heating_bed(&self) -> bool {
        self.channel(ChannelId::Bed).is_heating()
    }

    /// Check if the bed is hotter than its target
    pub fn is_cooling_bed(&self) -> bool {
        self.channel(ChannelId::Bed).is_cooling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Raw;
    use crate::control::ACTUATION_MAX;
    use crate::traits::SensorError;

    const WATCH_MS: u32 = 20_000;
    const TICK_MS: u32 = 50;

    /// Sensors driven directly by the test in °C
    struct SimSensors {
        raw: [Raw; CHANNEL_COUNT],
        fault: [Option<SensorError>; CHANNEL_COUNT],
    }

    impl SimSensors {
        fn at_room_temp(manager: &TemperatureManager) -> Self {
            let mut sensors = Self {
                raw: [0; CHANNEL_COUNT],
                fault: [None; CHANNEL_COUNT],
            };
            for id in ChannelId::ALL {
                sensors.set(manager, id, 20.0);
            }
            sensors
        }

        fn set(&mut self, manager: &TemperatureManager, id: ChannelId, celsius: f32) {
            self.raw[id.index()] = manager.channel(id).table().celsius_to_raw(celsius);
        }
    }

    impl SensorBank for SimSensors {
        fn read_raw(&mut self, id: ChannelId) -> Result<Raw, SensorError> {
            match self.fault[id.index()] {
                Some(err) => Err(err),
                None => Ok(self.raw[id.index()]),
            }
        }
    }

    #[derive(Default)]
    struct SimHeaters {
        levels: [u8; CHANNEL_COUNT],
        writes: usize,
    }

    impl HeaterBank for SimHeaters {
        fn set_power(&mut self, id: ChannelId, level: u8) {
            self.levels[id.index()] = level;
            self.writes += 1;
        }
    }

    fn manager() -> TemperatureManager {
        TemperatureManager::new(&ThermalConfig::default()).unwrap()
    }

    fn tripped(events: &Events, id: ChannelId) -> bool {
        events.contains(&ThermalEvent::RunawayTripped(id))
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = ThermalConfig::default();
        config.period_ms = 0;
        assert_eq!(
            TemperatureManager::new(&config).err(),
            Some(ConfigError::InvalidPeriod)
        );
    }

    #[test]
    fn test_initial_state() {
        let mgr = manager();
        for status in mgr.statuses() {
            assert!(status.enabled);
            assert!(!status.tripped);
            assert_eq!(status.target_c, None);
            assert_eq!(status.actuation, 0);
        }
        assert!(matches!(mgr.regulator(ChannelId::Hotend0), Regulator::Pid(_)));
        assert!(matches!(mgr.regulator(ChannelId::Bed), Regulator::BangBang(_)));
    }

    #[test]
    fn test_every_channel_written_each_period() {
        let mut mgr = manager();
        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();

        let events = mgr.manage_heaters(0, &mut sensors, &mut heaters);
        assert!(events.is_empty());
        assert_eq!(heaters.writes, CHANNEL_COUNT);
        assert_eq!(heaters.levels, [0; CHANNEL_COUNT]);
        assert!((mgr.deg_bed() - 20.0).abs() < 0.1);
    }

    #[test]
    fn test_target_requests() {
        let mut mgr = manager();
        assert_eq!(
            mgr.set_target_hotend(2, 200.0),
            Err(ControlError::UnknownExtruder(2))
        );

        mgr.set_target_hotend(1, 500.0).unwrap();
        assert_eq!(mgr.deg_target_hotend(1), Some(300.0));

        mgr.set_target_bed(60.0).unwrap();
        let bed = mgr.deg_target_bed().unwrap();
        assert!((bed - 60.0).abs() < 0.1);

        mgr.all_off();
        assert_eq!(mgr.deg_target_hotend(1), None);
        assert_eq!(mgr.deg_target_bed(), None);
        assert_eq!(mgr.deg_target_hotend(7), None);
        assert_eq!(mgr.deg_hotend(7), None);
    }

    #[test]
    fn test_heat_up_to_target() {
        let mut mgr = manager();
        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();

        mgr.set_target_hotend(0, 200.0).unwrap();

        // One degree per period: reaches 200°C after 9s, inside the watch period
        let mut was_heating = true;
        let mut heating_transitions = 0;
        for step in 0..300u32 {
            let temp = (20 + step).min(200) as f32;
            sensors.set(&mgr, ChannelId::Hotend0, temp);

            let events = mgr.manage_heaters(step * TICK_MS, &mut sensors, &mut heaters);
            assert!(!tripped(&events, ChannelId::Hotend0));
            assert!(heaters.levels[0] <= ACTUATION_MAX);

            let heating = mgr.is_heating_hotend(0);
            if temp <= 198.0 {
                assert!(heating, "still heating at {temp}");
            }
            if temp >= 199.0 {
                assert!(!heating, "past early cutoff at {temp}");
            }
            if heating != was_heating {
                heating_transitions += 1;
                was_heating = heating;
            }
        }

        assert_eq!(heating_transitions, 1);
        assert!(mgr.channel(ChannelId::Hotend0).is_enabled());
        assert!(!mgr.is_cooling_hotend(0));
        assert!(!mgr.channel(ChannelId::Hotend0).watch_state().armed);
    }

    #[test]
    fn test_full_power_far_below_target() {
        let mut mgr = manager();
        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();

        mgr.set_target_hotend(0, 200.0).unwrap();
        mgr.manage_heaters(0, &mut sensors, &mut heaters);
        assert_eq!(heaters.levels[0], ACTUATION_MAX);
        assert_eq!(mgr.status(ChannelId::Hotend0).actuation, ACTUATION_MAX);
        assert_eq!(heaters.levels[1], 0);
    }

    #[test]
    fn test_stuck_sensor_trips_once_and_stays_off() {
        let mut mgr = manager();
        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();

        sensors.set(&mgr, ChannelId::Hotend0, 100.0);
        mgr.set_target_hotend(0, 150.0).unwrap();

        let mut trips = 0;
        let mut now = 0;
        while now <= 2 * WATCH_MS {
            let events = mgr.manage_heaters(now, &mut sensors, &mut heaters);
            if tripped(&events, ChannelId::Hotend0) {
                trips += 1;
                assert!(now >= WATCH_MS);
            }
            now += TICK_MS;
        }

        assert_eq!(trips, 1);
        let status = mgr.status(ChannelId::Hotend0);
        assert!(!status.enabled);
        assert!(status.tripped);
        assert_eq!(heaters.levels[0], 0);

        // Whatever the sensor does now, the channel stays off
        for step in 0..200u32 {
            sensors.set(&mgr, ChannelId::Hotend0, 20.0 + step as f32);
            let events = mgr.manage_heaters(now, &mut sensors, &mut heaters);
            assert!(events.is_empty());
            assert_eq!(heaters.levels[0], 0);
            now += TICK_MS;
        }
        assert_eq!(
            mgr.set_target_hotend(0, 200.0),
            Err(ControlError::ChannelDisabled(ChannelId::Hotend0))
        );

        // Other channels are unaffected
        assert!(mgr.channel(ChannelId::Hotend1).is_enabled());
        assert!(mgr.channel(ChannelId::Bed).is_enabled());
    }

    #[test]
    fn test_rising_sensor_does_not_trip() {
        let mut mgr = manager();
        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();

        sensors.set(&mgr, ChannelId::Hotend0, 100.0);
        mgr.set_target_hotend(0, 150.0).unwrap();
        mgr.manage_heaters(0, &mut sensors, &mut heaters);
        assert!(mgr.channel(ChannelId::Hotend0).watch_state().armed);

        sensors.set(&mgr, ChannelId::Hotend0, 103.0);
        let mut now = TICK_MS;
        while now <= 3 * WATCH_MS {
            let events = mgr.manage_heaters(now, &mut sensors, &mut heaters);
            assert!(events.is_empty());
            now += TICK_MS;
        }

        assert!(mgr.channel(ChannelId::Hotend0).is_enabled());
        assert!(!mgr.channel(ChannelId::Hotend0).watch_state().armed);
    }

    #[test]
    fn test_manual_rearm() {
        let mut mgr = manager();
        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();

        mgr.set_target_bed(80.0).unwrap();
        let mut now = 0;
        while mgr.channel(ChannelId::Bed).is_enabled() {
            mgr.manage_heaters(now, &mut sensors, &mut heaters);
            now += TICK_MS;
        }
        assert_eq!(heaters.levels[2], 0);

        assert_eq!(mgr.rearm(ChannelId::Bed), Ok(()));
        let status = mgr.status(ChannelId::Bed);
        assert!(status.enabled);
        assert!(!status.tripped);
        assert_eq!(status.target_c, None);

        mgr.set_target_bed(80.0).unwrap();
        mgr.manage_heaters(now, &mut sensors, &mut heaters);
        assert_eq!(heaters.levels[2], ACTUATION_MAX);
    }

    #[test]
    fn test_power_cycle_policy_refuses_rearm() {
        let mut config = ThermalConfig::default();
        config.rearm = RearmPolicy::PowerCycle;
        let mut mgr = TemperatureManager::new(&config).unwrap();

        assert_eq!(mgr.rearm(ChannelId::Hotend0), Ok(()));
        mgr.disable_all();
        assert_eq!(
            mgr.rearm(ChannelId::Hotend0),
            Err(ControlError::RearmNotPermitted(ChannelId::Hotend0))
        );
        assert!(!mgr.channel(ChannelId::Hotend0).is_enabled());
    }

    #[test]
    fn test_sensor_fault_forces_off_then_trips() {
        let mut mgr = manager();
        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();

        sensors.set(&mgr, ChannelId::Hotend0, 100.0);
        mgr.set_target_hotend(0, 200.0).unwrap();
        mgr.manage_heaters(0, &mut sensors, &mut heaters);
        assert_eq!(heaters.levels[0], ACTUATION_MAX);

        sensors.fault[0] = Some(SensorError::OpenCircuit);
        let events = mgr.manage_heaters(TICK_MS, &mut sensors, &mut heaters);
        assert_eq!(
            events.as_slice(),
            &[ThermalEvent::SensorFault(ChannelId::Hotend0, SensorError::OpenCircuit)]
        );
        assert_eq!(heaters.levels[0], 0);

        let mut now = 2 * TICK_MS;
        let mut trips = 0;
        while now <= 2 * WATCH_MS {
            let events = mgr.manage_heaters(now, &mut sensors, &mut heaters);
            if tripped(&events, ChannelId::Hotend0) {
                trips += 1;
            }
            assert_eq!(heaters.levels[0], 0);
            now += TICK_MS;
        }
        assert_eq!(trips, 1);
    }

    #[test]
    fn test_over_temperature_cutoff() {
        let mut mgr = manager();
        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();

        sensors.set(&mgr, ChannelId::Hotend0, 280.0);
        mgr.set_target_hotend(0, 300.0).unwrap();
        let events = mgr.manage_heaters(0, &mut sensors, &mut heaters);
        assert!(events.contains(&ThermalEvent::OverTemperature(ChannelId::Hotend0)));
        assert_eq!(heaters.levels[0], 0);

        // Not latched
        sensors.set(&mgr, ChannelId::Hotend0, 250.0);
        let events = mgr.manage_heaters(TICK_MS, &mut sensors, &mut heaters);
        assert!(events.is_empty());
        assert!(heaters.levels[0] > 0);
    }

    #[test]
    fn test_bed_bang_bang_interval() {
        let mut mgr = manager();
        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();

        mgr.set_target_bed(60.0).unwrap();
        mgr.manage_heaters(0, &mut sensors, &mut heaters);
        assert_eq!(heaters.levels[2], ACTUATION_MAX);

        // Hold until the next 5s check
        sensors.set(&mgr, ChannelId::Bed, 65.0);
        mgr.manage_heaters(1_000, &mut sensors, &mut heaters);
        assert_eq!(heaters.levels[2], ACTUATION_MAX);
        mgr.manage_heaters(5_000, &mut sensors, &mut heaters);
        assert_eq!(heaters.levels[2], 0);
        assert!(mgr.is_cooling_bed());
        assert!(!mgr.is_heating_bed());
    }

    #[test]
    fn test_pid_capability_off_uses_bang_bang() {
        let mut config = ThermalConfig::default();
        config.capabilities.pid = false;
        let mut mgr = TemperatureManager::new(&config).unwrap();
        assert!(matches!(
            mgr.regulator(ChannelId::Hotend0),
            Regulator::BangBang(_)
        ));

        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();
        mgr.set_target_hotend(0, 199.0).unwrap();
        sensors.set(&mgr, ChannelId::Hotend0, 198.0);
        mgr.manage_heaters(0, &mut sensors, &mut heaters);
        assert_eq!(heaters.levels[0], ACTUATION_MAX);
    }

    #[test]
    fn test_extrusion_feed_forward() {
        let mut config = ThermalConfig::default();
        config.capabilities.extrusion_rate = true;
        let hotend = config.channel_mut(ChannelId::Hotend0);
        hotend.gains.kc = 2.0;
        hotend.derivative_smoothing = 0.0;
        let mut mgr = TemperatureManager::new(&config).unwrap();

        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();
        sensors.set(&mgr, ChannelId::Hotend0, 200.0);
        mgr.set_target_hotend(0, 200.0).unwrap();

        mgr.manage_heaters(0, &mut sensors, &mut heaters);
        assert_eq!(heaters.levels[0], 0);

        mgr.set_extrusion_rate(10.0);
        mgr.manage_heaters(TICK_MS, &mut sensors, &mut heaters);
        assert_eq!(heaters.levels[0], 20);
    }

    #[test]
    fn test_extrusion_rate_ignored_without_capability() {
        let mut mgr = manager();
        let mut sensors = SimSensors::at_room_temp(&mgr);
        let mut heaters = SimHeaters::default();
        sensors.set(&mgr, ChannelId::Hotend0, 200.0);
        mgr.set_target_hotend(0, 200.0).unwrap();

        mgr.set_extrusion_rate(10.0);
        mgr.manage_heaters(0, &mut sensors, &mut heaters);
        assert_eq!(heaters.levels[0], 0);
    }

    #[test]
    fn test_auto_shutdown() {
        let mut mgr = manager();
        mgr.set_target_hotend(0, 230.0).unwrap();
        assert!(!mgr.auto_shutdown());
        assert!(mgr.deg_target_hotend(0).is_some());

        let mut config = ThermalConfig::default();
        config.capabilities.auto_shutdown = true;
        let mut mgr = TemperatureManager::new(&config).unwrap();
        mgr.set_target_hotend(0, 230.0).unwrap();
        mgr.set_target_hotend(1, 180.0).unwrap();
        mgr.set_target_bed(60.0).unwrap();

        assert!(mgr.auto_shutdown());
        assert_eq!(mgr.deg_target_hotend(0), None);
        assert!(mgr.deg_target_hotend(1).is_some());
        assert!(mgr.deg_target_bed().is_some());
        assert!(mgr.channel(ChannelId::Hotend0).is_enabled());
    }

    #[test]
    fn test_deterministic_given_same_inputs() {
        let run = || {
            let mut mgr = manager();
            let mut sensors = SimSensors::at_room_temp(&mgr);
            let mut heaters = SimHeaters::default();
            mgr.set_target_hotend(0, 210.0).unwrap();
            mgr.set_target_bed(70.0).unwrap();
            let mut trace = [[0u8; CHANNEL_COUNT]; 50];
            for (step, levels) in trace.iter_mut().enumerate() {
                let step = step as u32;
                sensors.set(&mgr, ChannelId::Hotend0, 150.0 + step as f32);
                sensors.set(&mgr, ChannelId::Bed, 40.0 + step as f32 / 2.0);
                mgr.manage_heaters(step * TICK_MS, &mut sensors, &mut heaters);
                *levels = heaters.levels;
            }
            trace
        };
        assert_eq!(run(), run());
    }
}
