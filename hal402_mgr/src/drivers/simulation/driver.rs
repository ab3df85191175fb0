//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `IoDriver` trait with one
//! software-emulated DS-402 device per drive, for development and testing
//! without physical hardware.

use super::device::SimulatedDevice;
use hal402_common::ds402::state::DriveState;
use hal402_common::ds402::word::{BitField, ControlWord, StatusWord};
use hal402_common::hal::config::ManagerConfig;
use hal402_common::hal::driver::{HalError, IoDriver};
use hal402_common::hal::signal::{
    INPUT_SIGNALS, OUTPUT_SIGNALS, SignalDirection, find_signal, pin_name, split_pin_name,
};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy)]
struct PinSlot {
    direction: SignalDirection,
    value: bool,
}

/// Simulation driver implementing the IoDriver trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Initialized flag
    initialized: bool,
    /// Start state of newly created devices
    initial_state: DriveState,
    /// Pin values by full pin name
    pins: HashMap<String, PinSlot>,
    /// One device per drive, keyed by drive name
    devices: BTreeMap<String, SimulatedDevice>,
    /// Completed cycles
    cycles: u64,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    pub fn new() -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            initialized: false,
            initial_state: DriveState::SwitchOnDisabled,
            pins: HashMap::new(),
            devices: BTreeMap::new(),
            cycles: 0,
        }
    }

    /// Force the device behind `drive` into `state`; inputs follow immediately.
    pub fn force_state(&mut self, drive: &str, state: DriveState) -> Result<(), HalError> {
        let device = self
            .devices
            .get_mut(drive)
            .ok_or_else(|| HalError::UnknownPin(format!("{drive}.*")))?;
        device.force_state(state);
        self.sync_inputs(drive);
        Ok(())
    }

    /// Current device state of `drive`.
    pub fn device_state(&self, drive: &str) -> Option<DriveState> {
        self.devices.get(drive).map(SimulatedDevice::state)
    }

    /// Completed `cycle()` calls.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn control_word(&self, drive: &str) -> ControlWord {
        OUTPUT_SIGNALS.iter().fold(ControlWord::default(), |word, spec| {
            let value = self
                .pins
                .get(&pin_name(drive, spec.name))
                .is_some_and(|slot| slot.value);
            word.with_bit(spec.bit, value)
        })
    }

    fn sync_inputs(&mut self, drive: &str) {
        let Some(word) = self.devices.get(drive).map(SimulatedDevice::status_word) else {
            return;
        };
        for spec in &INPUT_SIGNALS {
            if let Some(slot) = self.pins.get_mut(&pin_name(drive, spec.name)) {
                slot.value = word.bit(spec.bit);
            }
        }
    }

    fn sync_all_inputs(&mut self) {
        let drives: Vec<String> = self.devices.keys().cloned().collect();
        for drive in &drives {
            self.sync_inputs(drive);
        }
    }

    fn require_init(&self) -> Result<(), HalError> {
        if self.initialized {
            Ok(())
        } else {
            Err(HalError::InitFailed("simulation driver not initialized".to_string()))
        }
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl IoDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self, config: &ManagerConfig) -> Result<(), HalError> {
        info!(
            "Initializing simulation driver for {} drives (initial state {})",
            config.fleet.drive_count, config.simulation.initial_state
        );
        self.initial_state = config.simulation.initial_state;
        self.pins.clear();
        self.devices.clear();
        self.cycles = 0;
        self.initialized = true;
        Ok(())
    }

    fn register_pin(&mut self, pin: &str, direction: SignalDirection) -> Result<(), HalError> {
        self.require_init()?;
        let (drive, signal) = split_pin_name(pin)
            .ok_or_else(|| HalError::ConfigError(format!("malformed pin name '{pin}'")))?;
        let spec = find_signal(signal)
            .ok_or_else(|| HalError::ConfigError(format!("unknown signal '{signal}'")))?;
        if spec.direction != direction {
            return Err(HalError::ConfigError(format!(
                "pin '{pin}' registered as {direction}, layout says {}",
                spec.direction
            )));
        }
        if self.pins.contains_key(pin) {
            return Err(HalError::ConfigError(format!("pin '{pin}' already exists")));
        }

        self.pins.insert(
            pin.to_string(),
            PinSlot {
                direction,
                value: false,
            },
        );
        self.devices
            .entry(drive.to_string())
            .or_insert_with(|| SimulatedDevice::new(self.initial_state));
        trace!("registered pin {} ({})", pin, direction);
        Ok(())
    }

    fn ready(&mut self) -> Result<(), HalError> {
        self.require_init()?;
        self.sync_all_inputs();
        debug!(
            "Simulation driver ready: {} pins, {} devices",
            self.pins.len(),
            self.devices.len()
        );
        Ok(())
    }

    fn read(&mut self, pin: &str) -> Result<bool, HalError> {
        self.pins
            .get(pin)
            .map(|slot| slot.value)
            .ok_or_else(|| HalError::UnknownPin(pin.to_string()))
    }

    fn write(&mut self, pin: &str, value: bool) -> Result<(), HalError> {
        let slot = self
            .pins
            .get_mut(pin)
            .ok_or_else(|| HalError::UnknownPin(pin.to_string()))?;
        if slot.direction != SignalDirection::Out {
            return Err(HalError::NotSupported(format!("pin '{pin}' is an input")));
        }
        slot.value = value;
        Ok(())
    }

    fn cycle(&mut self, dt: Duration) -> Result<(), HalError> {
        self.require_init()?;
        trace!("Simulation driver cycle, dt={:?}", dt);

        let drives: Vec<String> = self.devices.keys().cloned().collect();
        for drive in &drives {
            let word = self.control_word(drive);
            if let Some(device) = self.devices.get_mut(drive) {
                device.latch(word);
                device.cycle();
            }
            self.sync_inputs(drive);
        }
        self.cycles += 1;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Shutting down simulation driver after {} cycles", self.cycles);
        self.devices.clear();
        self.pins.clear();
        self.initialized = false;
        Ok(())
    }
}

/// Status word currently presented on the input pins of `drive`.
pub fn presented_status_word(driver: &mut SimulationDriver, drive: &str) -> Result<StatusWord, HalError> {
    INPUT_SIGNALS.iter().try_fold(StatusWord::default(), |word, spec| {
        Ok(word.with_bit(spec.bit, driver.read(&pin_name(drive, spec.name))?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal402_common::ds402::classifier::{canonical_status_word, classify};

    fn driver_with(drive: &str, initial: DriveState) -> SimulationDriver {
        let mut config = ManagerConfig::default();
        config.simulation.initial_state = initial;
        let mut driver = SimulationDriver::new();
        driver.init(&config).unwrap();
        for spec in INPUT_SIGNALS.iter().chain(OUTPUT_SIGNALS.iter()) {
            driver
                .register_pin(&pin_name(drive, spec.name), spec.direction)
                .unwrap();
        }
        driver.ready().unwrap();
        driver
    }

    fn command(driver: &mut SimulationDriver, drive: &str, word: ControlWord) {
        for spec in &OUTPUT_SIGNALS {
            driver
                .write(&pin_name(drive, spec.name), word.bit(spec.bit))
                .unwrap();
        }
        driver.cycle(Duration::from_millis(1)).unwrap();
    }

    #[test]
    fn test_register_before_init_fails() {
        let mut driver = SimulationDriver::new();
        assert!(matches!(
            driver.register_pin("drive_1.halt", SignalDirection::Out),
            Err(HalError::InitFailed(_))
        ));
    }

    #[test]
    fn test_register_validates_layout() {
        let mut driver = SimulationDriver::new();
        driver.init(&ManagerConfig::default()).unwrap();
        assert!(driver.register_pin("drive_1", SignalDirection::Out).is_err());
        assert!(driver.register_pin("drive_1.bogus", SignalDirection::Out).is_err());
        assert!(driver.register_pin("drive_1.halt", SignalDirection::In).is_err());
        driver.register_pin("drive_1.halt", SignalDirection::Out).unwrap();
        assert!(driver.register_pin("drive_1.halt", SignalDirection::Out).is_err());
    }

    #[test]
    fn test_ready_presents_initial_state() {
        let mut driver = driver_with("drive_1", DriveState::SwitchOnDisabled);
        let word = presented_status_word(&mut driver, "drive_1").unwrap();
        assert_eq!(word, canonical_status_word(DriveState::SwitchOnDisabled));
    }

    #[test]
    fn test_inputs_are_read_only() {
        let mut driver = driver_with("drive_1", DriveState::SwitchOnDisabled);
        assert!(matches!(
            driver.write("drive_1.fault", true),
            Err(HalError::NotSupported(_))
        ));
        assert!(matches!(driver.read("drive_9.fault"), Err(HalError::UnknownPin(_))));
    }

    #[test]
    fn test_device_follows_control_words() {
        let mut driver = driver_with("drive_1", DriveState::SwitchOnDisabled);
        command(&mut driver, "drive_1", ControlWord::CMD_SHUTDOWN);
        command(&mut driver, "drive_1", ControlWord::CMD_SWITCH_ON);
        command(&mut driver, "drive_1", ControlWord::CMD_ENABLE_OPERATION);
        let word = presented_status_word(&mut driver, "drive_1").unwrap();
        assert_eq!(classify(word), DriveState::OperationEnabled);
        assert_eq!(driver.cycles(), 3);
    }

    #[test]
    fn test_force_state_updates_inputs() {
        let mut driver = driver_with("drive_1", DriveState::SwitchOnDisabled);
        driver.force_state("drive_1", DriveState::Fault).unwrap();
        assert_eq!(driver.device_state("drive_1"), Some(DriveState::Fault));
        assert!(driver.read("drive_1.fault").unwrap());
        assert!(driver.force_state("drive_7", DriveState::Fault).is_err());
    }

    #[test]
    fn test_shutdown_clears_pins() {
        let mut driver = driver_with("drive_1", DriveState::SwitchOnDisabled);
        driver.shutdown().unwrap();
        assert!(driver.read("drive_1.halt").is_err());
        assert_eq!(driver.device_state("drive_1"), None);
    }
}
