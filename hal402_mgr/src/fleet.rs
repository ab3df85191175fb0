//! Fleet manager: drive arena, requested-state table and convergence loop.
//!
//! A request installs one transition path on every drive and then runs at
//! most [`DriveState::COUNT`] lockstep cycles:
//!
//! ```text
//! step (non-converged drives) → driver.cycle() → read + classify (all) → publish
//! ```
//!
//! The loop stops early once every drive reports the target state. Running
//! out of attempts is not an error: the overall state becomes `error` and is
//! returned like any other outcome.

use crate::drive::{Drive, DriveError};
use hal402_common::config::ConfigError;
use hal402_common::ds402::path::{
    PATH_TO_OPERATION_ENABLED, PATH_TO_SWITCH_ON_DISABLED, TransitionPath,
};
use hal402_common::ds402::state::{DriveState, LogicalState};
use hal402_common::hal::config::ManagerConfig;
use hal402_common::hal::driver::{HalError, IoDriver};
use hal402_common::telemetry::{
    ErrorEvent, StatusEvent, TelemetryPublisher, error_topic, status_topic,
};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fleet-level errors.
#[derive(Debug, Clone, Error)]
pub enum FleetError {
    /// Name not present in the requested-state table. No drive was touched.
    #[error("request for state {0} failed, state not known")]
    InvalidStateRequest(String),

    /// Another request is still converging.
    #[error("request rejected, another request is in flight")]
    RequestInFlight,

    /// The manager loop is no longer serving requests.
    #[error("manager stopped")]
    ManagerStopped,

    /// No drive with that name.
    #[error("unknown drive '{0}'")]
    UnknownDrive(String),

    /// Per-drive failure outside the recoverable set.
    #[error("{drive}: {source}")]
    Drive {
        /// Drive name.
        drive: String,
        /// Underlying error.
        source: DriveError,
    },

    /// I/O boundary failure (fatal).
    #[error(transparent)]
    Io(#[from] HalError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FleetError {
    fn from_drive(drive: &str, error: DriveError) -> Self {
        match error {
            DriveError::Io(e) => Self::Io(e),
            source => Self::Drive {
                drive: drive.to_string(),
                source,
            },
        }
    }
}

/// Path and target state a logical state resolves to.
#[derive(Debug, Clone, Copy)]
pub struct StateRoute {
    /// Path installed on every drive.
    pub path: &'static TransitionPath,
    /// State every drive must reach.
    pub target: DriveState,
}

/// Requested-state table. Read-only after construction.
#[derive(Debug, Clone)]
pub struct StateTable {
    routes: Vec<(LogicalState, StateRoute)>,
}

impl StateTable {
    /// Standard table: `started` enables, everything else disables.
    pub fn ds402() -> Self {
        let disable = StateRoute {
            path: &PATH_TO_SWITCH_ON_DISABLED,
            target: DriveState::SwitchOnDisabled,
        };
        let enable = StateRoute {
            path: &PATH_TO_OPERATION_ENABLED,
            target: DriveState::OperationEnabled,
        };
        Self {
            routes: vec![
                (LogicalState::Unknown, disable),
                (LogicalState::Stopped, disable),
                (LogicalState::Started, enable),
                (LogicalState::Error, disable),
            ],
        }
    }

    /// Route for a logical state.
    pub fn route(&self, state: LogicalState) -> Option<StateRoute> {
        self.routes
            .iter()
            .find(|(logical, _)| *logical == state)
            .map(|(_, route)| *route)
    }

    /// Resolve a command-boundary name.
    pub fn resolve(&self, name: &str) -> Option<(LogicalState, StateRoute)> {
        let state = name.parse::<LogicalState>().ok()?;
        self.route(state).map(|route| (state, route))
    }

    /// Accepted names, in table order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.iter().map(|(state, _)| state.as_str())
    }
}

impl Default for StateTable {
    fn default() -> Self {
        Self::ds402()
    }
}

struct Topics {
    status: String,
    error: String,
}

/// Owns the drives, the I/O driver and the telemetry publisher.
pub struct FleetManager<D: IoDriver> {
    service_name: String,
    cycle_time: Duration,
    driver: D,
    drives: Vec<Drive>,
    index: HashMap<String, usize>,
    topics: Vec<Topics>,
    table: StateTable,
    publisher: Box<dyn TelemetryPublisher>,
    prev_state: LogicalState,
    curr_state: LogicalState,
    last_attempts: usize,
}

impl<D: IoDriver> FleetManager<D> {
    /// Build the fleet.
    ///
    /// Initializes the driver, registers every pin, applies configured
    /// injections and runs one inspection pass so that every drive has a
    /// classified state before the first request.
    pub fn new(
        config: &ManagerConfig,
        mut driver: D,
        publisher: Box<dyn TelemetryPublisher>,
    ) -> Result<Self, FleetError> {
        config.validate()?;
        let service_name = config.shared.service_name.clone();

        driver.init(config)?;
        info!(
            "{}: driver {} v{} initialized",
            service_name,
            driver.name(),
            driver.version()
        );

        let mut drives = Vec::with_capacity(config.fleet.drive_count);
        let mut index = HashMap::with_capacity(config.fleet.drive_count);
        let mut topics = Vec::with_capacity(config.fleet.drive_count);
        for name in config.fleet.drive_names() {
            let drive = Drive::new(&name, config.simulation.enabled);
            drive.register_pins(&mut driver)?;
            index.insert(name.clone(), drives.len());
            topics.push(Topics {
                status: status_topic(&service_name, &name),
                error: error_topic(&service_name, &name),
            });
            drives.push(drive);
            info!("{}: {} created", service_name, name);
        }
        driver.ready()?;

        let mut fleet = Self {
            service_name,
            cycle_time: config.fleet.cycle_time(),
            driver,
            drives,
            index,
            topics,
            table: StateTable::ds402(),
            publisher,
            prev_state: LogicalState::Unknown,
            curr_state: LogicalState::Unknown,
            last_attempts: 0,
        };

        for (name, state) in &config.simulation.pinned {
            fleet.inject_status(name, *state)?;
        }
        fleet.inspect()?;
        Ok(fleet)
    }

    /// Drive the fleet toward the logical state `name`.
    ///
    /// Returns the resulting overall state: `name` on convergence,
    /// [`LogicalState::Error`] when the attempt budget runs out.
    ///
    /// # Errors
    /// `InvalidStateRequest` for a name not in the table (no side effects),
    /// `Io` if the I/O boundary fails mid-run.
    pub fn request_state(&mut self, name: &str) -> Result<LogicalState, FleetError> {
        let Some((requested, route)) = self.table.resolve(name) else {
            info!("{}: request for state failed, {} not a valid state", self.service_name, name);
            return Err(FleetError::InvalidStateRequest(name.to_string()));
        };

        info!(
            "{}: request {} -> {} via {}",
            self.service_name,
            requested,
            route.target,
            route.path.name()
        );
        for drive in &mut self.drives {
            drive.set_active_path(route.path);
        }

        let max_attempts = self.max_attempts();
        let mut converged = false;
        let mut attempts = 0;
        while attempts < max_attempts {
            attempts += 1;
            for drive in &mut self.drives {
                if drive.state() == route.target {
                    continue;
                }
                match drive.step(&mut self.driver) {
                    Ok(_) => {}
                    Err(DriveError::Io(e)) => return Err(FleetError::Io(e)),
                    // Recorded on the drive and published below.
                    Err(_) => {}
                }
            }
            self.driver.cycle(self.cycle_time)?;
            self.inspect()?;
            self.publish_states();

            if self.all_at(route.target) {
                converged = true;
                break;
            }
        }
        self.last_attempts = attempts;

        let outcome = if converged {
            info!(
                "{}: all drives {} after {} attempt(s)",
                self.service_name, route.target, attempts
            );
            requested
        } else {
            let stuck: Vec<String> = self
                .drives
                .iter()
                .filter(|d| d.state() != route.target)
                .map(|d| format!("{}={}", d.name(), d.state()))
                .collect();
            warn!(
                "{}: request {} exhausted {} attempts, not converged: {}",
                self.service_name,
                requested,
                max_attempts,
                stuck.join(", ")
            );
            LogicalState::Error
        };
        self.set_overall_state(outcome);
        Ok(outcome)
    }

    fn set_overall_state(&mut self, state: LogicalState) {
        self.prev_state = self.curr_state;
        self.curr_state = state;
        if self.prev_state != self.curr_state {
            info!(
                "{}: overall state {} -> {}",
                self.service_name, self.prev_state, self.curr_state
            );
        }
    }

    /// Read and classify every drive, in insertion order.
    pub fn inspect(&mut self) -> Result<(), FleetError> {
        for drive in &mut self.drives {
            drive
                .read_status(&mut self.driver)
                .map_err(|e| FleetError::from_drive(drive.name(), e))?;
            drive.classify_state();
            debug!(
                "{}: {} status_word: {:#010b} status: {}",
                self.service_name,
                drive.name(),
                drive.status_word().bits(),
                drive.state()
            );
        }
        Ok(())
    }

    /// Publish one status and one error event per drive.
    pub fn publish_states(&mut self) {
        for (drive, topics) in self.drives.iter_mut().zip(&self.topics) {
            self.publisher.publish_status(&topics.status, &drive.status_event());
            self.publisher.publish_error(&topics.error, &drive.error_event());
        }
    }

    /// One idle inspection cycle: exchange, read, classify, publish.
    ///
    /// No control word is written.
    pub fn idle_cycle(&mut self) -> Result<(), FleetError> {
        self.driver.cycle(self.cycle_time)?;
        self.inspect()?;
        self.publish_states();
        Ok(())
    }

    /// Publish a test message on every simulated drive's topics.
    pub fn announce(&mut self) {
        for (drive, topics) in self.drives.iter().zip(&self.topics) {
            if !drive.is_simulated() {
                continue;
            }
            self.publisher
                .publish_status(&topics.status, &StatusEvent::test_message(drive.name()));
            self.publisher
                .publish_error(&topics.error, &ErrorEvent::test_message(drive.name()));
        }
    }

    /// Pin a drive's inputs to the canonical word of `state`.
    pub fn inject_status(&mut self, drive: &str, state: DriveState) -> Result<(), FleetError> {
        let target = self.drive_mut(drive)?;
        target
            .inject_status(state)
            .map_err(|e| FleetError::from_drive(drive, e))?;
        info!("{}: {} inputs pinned to {}", self.service_name, drive, state);
        Ok(())
    }

    /// Return a drive's inputs to the hardware source.
    pub fn release_injection(&mut self, drive: &str) -> Result<(), FleetError> {
        self.drive_mut(drive)?.release_injection();
        Ok(())
    }

    /// Returns true if every drive reports `state`.
    pub fn all_at(&self, state: DriveState) -> bool {
        self.drives.iter().all(|drive| drive.state() == state)
    }

    /// Attempt budget of one request.
    pub fn max_attempts(&self) -> usize {
        DriveState::COUNT
    }

    /// Attempts used by the last request.
    pub fn last_attempts(&self) -> usize {
        self.last_attempts
    }

    /// Drive by name.
    pub fn drive(&self, name: &str) -> Option<&Drive> {
        self.index.get(name).map(|&i| &self.drives[i])
    }

    /// Mutable drive by name.
    pub fn drive_mut(&mut self, name: &str) -> Result<&mut Drive, FleetError> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| FleetError::UnknownDrive(name.to_string()))?;
        Ok(&mut self.drives[i])
    }

    /// Drives in insertion order.
    pub fn drives(&self) -> &[Drive] {
        &self.drives
    }

    /// The I/O driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable I/O driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Requested-state table.
    pub fn table(&self) -> &StateTable {
        &self.table
    }

    /// Current overall state.
    pub fn overall_state(&self) -> LogicalState {
        self.curr_state
    }

    /// Overall state before the last change.
    pub fn previous_state(&self) -> LogicalState {
        self.prev_state
    }

    /// Service name used for topics and logs.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Idle cycle period.
    pub fn cycle_time(&self) -> Duration {
        self.cycle_time
    }

    /// Shut the driver down.
    pub fn shutdown(&mut self) -> Result<(), FleetError> {
        self.driver.shutdown()?;
        Ok(())
    }
}
