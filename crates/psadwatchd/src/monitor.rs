//! Per-daemon liveness checks and the restart sequence.

use nix::sys::signal::kill;
use nix::unistd::Pid;
use psadwatch_config::MonitoredProcess;
use tracing::{debug, info, warn};

use crate::alert::{AlertKind, AlertMessage, AlertNotifier, AlertTransport};
use crate::launcher::{LaunchError, ProcessLauncher};
use crate::ledger::RetryLedger;
use crate::pidfile::{PidFileRead, read_pid_file};

const MONITOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::monitor");

/// Tests whether a process id refers to a running process.
pub trait LivenessProbe {
    /// Returns `true` when `pid` exists and may be signalled.
    fn is_alive(&self, pid: Pid) -> bool;
}

/// Probe that sends signal 0, which checks existence and permission without
/// delivering anything.
///
/// Any failure, including `EPERM`, counts as dead.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalProbe;

impl LivenessProbe for SignalProbe {
    fn is_alive(&self, pid: Pid) -> bool {
        match kill(pid, None) {
            Ok(()) => true,
            Err(errno) => {
                debug!(
                    target: MONITOR_TARGET,
                    pid = pid.as_raw(),
                    errno = %errno,
                    "liveness probe failed"
                );
                false
            }
        }
    }
}

/// Why a daemon was judged dead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathCause {
    /// The pid file could not be opened or read.
    PidFileUnreadable,
    /// The pid file did not start with a positive process id.
    MalformedPid(String),
    /// The recorded process no longer exists or cannot be signalled.
    NotRunning(Pid),
}

/// Result of probing one daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    /// The recorded process answered the probe.
    Alive(Pid),
    /// The daemon needs restarting.
    Dead(DeathCause),
}

impl Liveness {
    /// Locates `process` through its pid file and probes it.
    pub fn of(process: &MonitoredProcess, probe: &impl LivenessProbe) -> Self {
        match read_pid_file(&process.pid_file) {
            PidFileRead::Unreadable(error) => {
                debug!(
                    target: MONITOR_TARGET,
                    process = %process.name,
                    file = %process.pid_file,
                    error = %error,
                    "could not read pid file"
                );
                Self::Dead(DeathCause::PidFileUnreadable)
            }
            PidFileRead::Malformed(text) => Self::Dead(DeathCause::MalformedPid(text)),
            PidFileRead::Pid(pid) if probe.is_alive(pid) => Self::Alive(pid),
            PidFileRead::Pid(pid) => Self::Dead(DeathCause::NotRunning(pid)),
        }
    }
}

/// Result of one supervisor check on one daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The daemon was running.
    Alive,
    /// The daemon was dead and a restart was attempted.
    RestartedOk,
    /// The retry limit was reached; the watchdog must exit.
    GaveUp,
}

/// Checks daemons and restarts the ones that have died.
#[derive(Debug)]
pub struct ProcessMonitor<'a, P, L, N> {
    probe: &'a P,
    launcher: &'a L,
    notifier: &'a N,
    transport: &'a AlertTransport,
    host: &'a str,
}

impl<'a, P, L, N> ProcessMonitor<'a, P, L, N>
where
    P: LivenessProbe,
    L: ProcessLauncher,
    N: AlertNotifier,
{
    /// Wires a monitor to its collaborators.
    pub const fn new(
        probe: &'a P,
        launcher: &'a L,
        notifier: &'a N,
        transport: &'a AlertTransport,
        host: &'a str,
    ) -> Self {
        Self {
            probe,
            launcher,
            notifier,
            transport,
            host,
        }
    }

    /// Checks `process` once, restarting it and updating `ledger` as needed.
    ///
    /// A dead daemon is announced, relaunched, then counted as a failure. When
    /// that failure reaches the retry limit the give-up alert is sent and
    /// [`Outcome::GaveUp`] is returned; the caller must terminate.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the restart cannot be performed.
    pub fn check(
        &self,
        process: &MonitoredProcess,
        ledger: &mut RetryLedger,
    ) -> Result<Outcome, LaunchError> {
        let cause = match Liveness::of(process, self.probe) {
            Liveness::Alive(pid) => {
                debug!(
                    target: MONITOR_TARGET,
                    process = %process.name,
                    pid = pid.as_raw(),
                    "daemon is running"
                );
                ledger.record_success(process.name);
                return Ok(Outcome::Alive);
            }
            Liveness::Dead(cause) => cause,
        };

        let kind = match cause {
            DeathCause::PidFileUnreadable => AlertKind::RestartMissingPidFile,
            DeathCause::MalformedPid(_) | DeathCause::NotRunning(_) => {
                AlertKind::RestartDeadProcess
            }
        };
        warn!(
            target: MONITOR_TARGET,
            process = %process.name,
            cause = ?cause,
            "daemon not running"
        );
        self.alert(kind, process);
        self.launcher
            .launch_and_wait(&process.binary, process.cmdline_file.as_deref())?;

        if ledger.record_failure(process.name) {
            warn!(
                target: MONITOR_TARGET,
                process = %process.name,
                attempts = ledger.failures(process.name),
                "retry limit reached"
            );
            self.alert(AlertKind::GaveUp, process);
            return Ok(Outcome::GaveUp);
        }
        info!(
            target: MONITOR_TARGET,
            process = %process.name,
            attempts = ledger.failures(process.name),
            max_retries = ledger.max_retries(),
            "restart attempted"
        );
        Ok(Outcome::RestartedOk)
    }

    fn alert(&self, kind: AlertKind, process: &MonitoredProcess) {
        let message = AlertMessage::new(kind, process.name, self.host);
        self.notifier.notify(self.transport, &message);
    }
}
