//! The periodic check, restart and reload loop.

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use psadwatch_config::{Config, ConfigStore, MonitoredProcess, ProcessName};
use tracing::{debug, info};

use crate::alert::{AlertNotifier, AlertTransport};
use crate::errors::WatchdogError;
use crate::launcher::ProcessLauncher;
use crate::ledger::RetryLedger;
use crate::monitor::{LivenessProbe, Outcome, ProcessMonitor};

const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Waits between supervisor ticks.
pub trait Pause {
    /// Blocks for `interval`.
    fn pause(&self, interval: Duration);
}

/// Pause backed by [`thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, interval: Duration) {
        thread::sleep(interval);
    }
}

/// Collaborators the supervisor drives on every tick.
#[derive(Debug)]
pub struct Collaborators<P, L, N, S> {
    /// Liveness probe for recorded pids.
    pub probe: P,
    /// Restarts dead daemons.
    pub launcher: L,
    /// Delivers operator alerts.
    pub notifier: N,
    /// Waits between ticks.
    pub pause: S,
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Per-daemon outcomes in check order.
    pub outcomes: Vec<(ProcessName, Outcome)>,
    /// Whether a changed configuration file was applied after the checks.
    pub reloaded: bool,
}

/// Owns the watchdog state and runs the supervision loop.
#[derive(Debug)]
pub struct Supervisor<P, L, N, S> {
    store: ConfigStore,
    processes: Vec<MonitoredProcess>,
    transport: AlertTransport,
    ledger: RetryLedger,
    host: String,
    collaborators: Collaborators<P, L, N, S>,
}

impl<P, L, N, S> Supervisor<P, L, N, S>
where
    P: LivenessProbe,
    L: ProcessLauncher,
    N: AlertNotifier,
    S: Pause,
{
    /// Builds a supervisor from the settings held by `store`.
    pub fn new(
        store: ConfigStore,
        host: impl Into<String>,
        collaborators: Collaborators<P, L, N, S>,
    ) -> Self {
        let config = store.config();
        let processes = config.monitored_processes();
        let transport = AlertTransport::from_config(config);
        let ledger = RetryLedger::new(config.max_retries);
        Self {
            store,
            processes,
            transport,
            ledger,
            host: host.into(),
            collaborators,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        self.store.config()
    }

    /// Retry counters.
    #[must_use]
    pub const fn ledger(&self) -> &RetryLedger {
        &self.ledger
    }

    /// Collaborators, exposed for inspection in tests.
    #[must_use]
    pub const fn collaborators(&self) -> &Collaborators<P, L, N, S> {
        &self.collaborators
    }

    /// Checks every monitored daemon once, then applies a changed
    /// configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::RestartExhausted`] as soon as a daemon gives
    /// up, skipping the remaining checks. Launch and reload failures are also
    /// returned.
    pub fn tick(&mut self) -> Result<TickReport, WatchdogError> {
        let monitor = ProcessMonitor::new(
            &self.collaborators.probe,
            &self.collaborators.launcher,
            &self.collaborators.notifier,
            &self.transport,
            &self.host,
        );
        let mut outcomes = Vec::with_capacity(self.processes.len());
        for process in &self.processes {
            let outcome = monitor
                .check(process, &mut self.ledger)
                .map_err(|source| WatchdogError::Launch {
                    process: process.name,
                    source,
                })?;
            if outcome == Outcome::GaveUp {
                return Err(WatchdogError::RestartExhausted {
                    process: process.name,
                    attempts: self.ledger.failures(process.name),
                });
            }
            outcomes.push((process.name, outcome));
        }

        let reloaded = self.store.reload_if_changed()?;
        if reloaded {
            self.apply_config();
        }
        Ok(TickReport { outcomes, reloaded })
    }

    /// Runs ticks forever, pausing for the configured interval between them.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Supervisor::tick`].
    pub fn run(mut self) -> Result<Infallible, WatchdogError> {
        info!(
            target: SUPERVISOR_TARGET,
            processes = self.processes.len(),
            interval_secs = self.config().check_interval_secs,
            max_retries = self.ledger.max_retries(),
            "supervision loop started"
        );
        loop {
            let report = self.tick()?;
            debug!(target: SUPERVISOR_TARGET, ?report, "tick complete");
            let interval = self.config().check_interval();
            self.collaborators.pause.pause(interval);
        }
    }

    fn apply_config(&mut self) {
        let config = self.store.config();
        self.processes = config.monitored_processes();
        self.transport = AlertTransport::from_config(config);
        self.ledger.set_max_retries(config.max_retries);
        info!(
            target: SUPERVISOR_TARGET,
            path = %self.store.path(),
            interval_secs = config.check_interval_secs,
            max_retries = config.max_retries,
            "configuration reloaded"
        );
    }
}
