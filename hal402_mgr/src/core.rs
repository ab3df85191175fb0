//! Manager core: idle inspection loop and request serving.
//!
//! The `ManagerCore` owns the [`FleetManager`] and runs it on one thread.
//! Each cycle performs an idle inspection, then serves queued requests until
//! the cycle deadline. A request runs to completion before the next idle
//! cycle starts, so the two never overlap.
//!
//! Requests arrive through [`RequestHandle`]s, which may live on other
//! threads. At most one request is in flight at a time; a concurrent call is
//! rejected with [`FleetError::RequestInFlight`].

use crate::fleet::{FleetError, FleetManager};
use hal402_common::ds402::state::LogicalState;
use hal402_common::hal::driver::IoDriver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one request as seen by the caller.
pub type Reply = Result<LogicalState, FleetError>;

struct PendingRequest {
    name: String,
    reply: Sender<Reply>,
}

/// Manager core owning the fleet and its loop.
pub struct ManagerCore<D: IoDriver> {
    /// Fleet under management
    fleet: FleetManager<D>,
    /// Running flag for loop control
    running: Arc<AtomicBool>,
    /// Idle cycle period
    cycle_time: Duration,
    /// Timing statistics
    stats: TimingStats,
    /// Queued requests
    requests: Receiver<PendingRequest>,
    /// Template for new handles
    handle: RequestHandle,
}

/// Timing statistics for idle loop monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimingStats {
    /// Number of idle cycles executed
    pub cycle_count: u64,
    /// Number of timing violations (cycle exceeded target)
    pub timing_violations: u64,
    /// Maximum observed cycle time
    pub max_cycle_time_us: u64,
    /// Sum of cycle times for average calculation
    pub total_cycle_time_us: u64,
    /// Requests served
    pub requests_served: u64,
}

impl TimingStats {
    /// Average cycle time in microseconds.
    pub fn avg_cycle_time_us(&self) -> u64 {
        self.total_cycle_time_us.checked_div(self.cycle_count).unwrap_or(0)
    }

    fn record(&mut self, elapsed: Duration, target: Duration) {
        let cycle_time_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.cycle_count += 1;
        self.total_cycle_time_us = self.total_cycle_time_us.saturating_add(cycle_time_us);
        self.max_cycle_time_us = self.max_cycle_time_us.max(cycle_time_us);

        if elapsed > target {
            self.timing_violations += 1;
            if self.timing_violations <= 10 || self.timing_violations % 1000 == 0 {
                warn!(
                    "Timing violation #{}: cycle took {}us (target {}us)",
                    self.timing_violations,
                    cycle_time_us,
                    target.as_micros()
                );
            }
        }
    }
}

/// Cloneable handle submitting requests to a running [`ManagerCore`].
#[derive(Clone)]
pub struct RequestHandle {
    sender: Sender<PendingRequest>,
    in_flight: Arc<AtomicBool>,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RequestHandle {
    /// Submit `name` and block until the manager answers.
    ///
    /// # Errors
    /// `RequestInFlight` if another request is being served,
    /// `ManagerStopped` if the core is gone, otherwise whatever
    /// [`FleetManager::request_state`] returns.
    pub fn request(&self, name: &str) -> Reply {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FleetError::RequestInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let (reply, response) = mpsc::channel();
        self.sender
            .send(PendingRequest {
                name: name.to_string(),
                reply,
            })
            .map_err(|_| FleetError::ManagerStopped)?;
        response.recv().map_err(|_| FleetError::ManagerStopped)?
    }

    /// Returns true while a request is being served.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Text returned on the command boundary for a request outcome.
pub fn response_text(reply: &Reply) -> String {
    match reply {
        Ok(state) => state.as_str().to_string(),
        Err(e) => e.to_string(),
    }
}

impl<D: IoDriver> ManagerCore<D> {
    /// Wrap a built fleet.
    pub fn new(fleet: FleetManager<D>) -> Self {
        let (sender, requests) = mpsc::channel();
        let cycle_time = fleet.cycle_time();
        info!(
            "ManagerCore created with {} drives, cycle_time={}ms",
            fleet.drives().len(),
            cycle_time.as_millis()
        );
        Self {
            fleet,
            running: Arc::new(AtomicBool::new(false)),
            cycle_time,
            stats: TimingStats::default(),
            requests,
            handle: RequestHandle {
                sender,
                in_flight: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    /// New handle for submitting requests.
    pub fn handle(&self) -> RequestHandle {
        self.handle.clone()
    }

    /// Run the idle loop until the running flag is cleared.
    ///
    /// # Errors
    /// Returns the first I/O boundary failure.
    pub fn run(&mut self) -> Result<(), FleetError> {
        info!(
            "Starting idle inspection loop (cycle_time={}ms)...",
            self.cycle_time.as_millis()
        );
        self.running.store(true, Ordering::SeqCst);
        self.fleet.announce();

        while self.running.load(Ordering::SeqCst) {
            self.run_cycle()?;
        }

        info!(
            "Idle loop stopped after {} cycles (violations: {}, requests: {})",
            self.stats.cycle_count, self.stats.timing_violations, self.stats.requests_served
        );
        Ok(())
    }

    /// One idle cycle followed by request serving until the deadline.
    pub fn run_cycle(&mut self) -> Result<(), FleetError> {
        let cycle_start = Instant::now();
        self.fleet.idle_cycle()?;
        self.stats.record(cycle_start.elapsed(), self.cycle_time);

        let deadline = cycle_start + self.cycle_time;
        while self.running.load(Ordering::SeqCst) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.requests.recv_timeout(remaining) {
                Ok(request) => self.serve(request)?,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    std::thread::sleep(remaining);
                    break;
                }
            }
        }

        if self.stats.cycle_count % 100 == 0 {
            debug!(
                "Idle loop: {} cycles, avg={}us, max={}us, violations={}",
                self.stats.cycle_count,
                self.stats.avg_cycle_time_us(),
                self.stats.max_cycle_time_us,
                self.stats.timing_violations
            );
        }
        Ok(())
    }

    fn serve(&mut self, request: PendingRequest) -> Result<(), FleetError> {
        let reply = self.fleet.request_state(&request.name);
        self.stats.requests_served += 1;
        // A fatal I/O failure stops the loop after the caller is told.
        let fatal = match &reply {
            Err(FleetError::Io(e)) => Some(FleetError::Io(e.clone())),
            _ => None,
        };
        if request.reply.send(reply).is_err() {
            debug!("Requester for '{}' went away", request.name);
        }
        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stop the loop and shut the driver down.
    pub fn shutdown(&mut self) -> Result<(), FleetError> {
        info!("Stopping");
        self.running.store(false, Ordering::SeqCst);
        self.fleet.shutdown()?;
        info!("Stopped");
        Ok(())
    }

    /// Get the running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Get timing statistics.
    pub fn stats(&self) -> TimingStats {
        self.stats
    }

    /// The managed fleet.
    pub fn fleet(&self) -> &FleetManager<D> {
        &self.fleet
    }

    /// Mutable access to the managed fleet.
    pub fn fleet_mut(&mut self) -> &mut FleetManager<D> {
        &mut self.fleet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulationDriver;
    use crate::telemetry::LatchedPublisher;
    use hal402_common::hal::config::ManagerConfig;

    fn make_core(rate_hz: f64) -> (ManagerCore<SimulationDriver>, LatchedPublisher) {
        let mut config = ManagerConfig::default();
        config.fleet.drive_count = 2;
        config.fleet.update_rate_hz = rate_hz;
        let latched = LatchedPublisher::new();
        let fleet =
            FleetManager::new(&config, SimulationDriver::new(), Box::new(latched.clone())).unwrap();
        (ManagerCore::new(fleet), latched)
    }

    #[test]
    fn test_idle_cycle_publishes_without_writes() {
        let (mut core, latched) = make_core(1000.0);
        core.running_flag().store(true, Ordering::SeqCst);
        core.run_cycle().unwrap();
        assert_eq!(core.stats().cycle_count, 1);
        assert_eq!(latched.published(), 4);
        assert!(core.fleet().drives().iter().all(|d| d.active_path().is_none()));
    }

    #[test]
    fn test_response_text() {
        assert_eq!(response_text(&Ok(LogicalState::Started)), "started");
        assert_eq!(response_text(&Ok(LogicalState::Error)), "error");
        assert_eq!(
            response_text(&Err(FleetError::InvalidStateRequest("bogus".to_string()))),
            "request for state bogus failed, state not known"
        );
    }

    #[test]
    fn test_in_flight_guard_rejects_second_request() {
        let (core, _) = make_core(1000.0);
        let handle = core.handle();
        handle.in_flight.store(true, Ordering::SeqCst);
        assert!(matches!(
            core.handle().request("started"),
            Err(FleetError::RequestInFlight)
        ));
        assert!(handle.is_busy());
    }

    #[test]
    fn test_request_after_core_dropped() {
        let (core, _) = make_core(1000.0);
        let handle = core.handle();
        drop(core);
        assert!(matches!(handle.request("started"), Err(FleetError::ManagerStopped)));
        // Guard released.
        assert!(!handle.is_busy());
    }

    #[test]
    fn test_run_returns_driver_failure() {
        let (mut core, _) = make_core(1000.0);
        core.fleet_mut().driver_mut().shutdown().unwrap();
        assert!(matches!(core.run(), Err(FleetError::Io(_))));
        assert_eq!(core.stats().cycle_count, 0);
    }

    #[test]
    fn test_timing_stats_average() {
        let mut stats = TimingStats::default();
        assert_eq!(stats.avg_cycle_time_us(), 0);
        stats.record(Duration::from_micros(100), Duration::from_millis(1));
        stats.record(Duration::from_micros(300), Duration::from_millis(1));
        stats.record(Duration::from_millis(2), Duration::from_millis(1));
        assert_eq!(stats.cycle_count, 3);
        assert_eq!(stats.max_cycle_time_us, 2000);
        assert_eq!(stats.timing_violations, 1);
        assert_eq!(stats.avg_cycle_time_us(), 800);
    }
}
