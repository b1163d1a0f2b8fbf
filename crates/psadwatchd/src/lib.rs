//! Watchdog that keeps the psad daemons running.
//!
//! `psadwatchd` polls `psad`, `kmsgsd`, and `diskmond` on a fixed interval.
//! Each daemon is located through its pid file and probed with signal 0. A
//! daemon that is gone is restarted from its configured binary, with its
//! original arguments when a command-line file is available, and the
//! operators listed in the config file are mailed about the restart.
//!
//! Restarts are counted per daemon. Once one daemon fails `max_retries`
//! consecutive checks the watchdog mails a final notice and exits with failure
//! status; there is no partial monitoring mode.
//!
//! The loop is strictly sequential. Restarting a daemon blocks until the
//! spawned process exits, which relies on the daemon detaching itself.
//!
//! Liveness is judged by pid only: if a dead daemon's pid has been reused by
//! an unrelated process, the probe succeeds and the daemon is reported alive
//! until that process exits.

mod alert;
mod errors;
mod launcher;
mod ledger;
mod monitor;
mod pidfile;
mod process;
mod supervisor;
mod telemetry;

pub use alert::{AlertKind, AlertMessage, AlertNotifier, AlertTransport, MailNotifier};
pub use errors::WatchdogError;
pub use launcher::{
    CommandLine, LaunchError, LaunchReport, MAX_ARG_LEN, ProcessLauncher, SystemLauncher,
    tokenize,
};
pub use ledger::RetryLedger;
pub use monitor::{DeathCause, Liveness, LivenessProbe, Outcome, ProcessMonitor, SignalProbe};
pub use pidfile::{PidFileRead, parse_pid, read_pid_file};
pub use process::{
    DaemonizeError, Daemonizer, LaunchMode, SystemDaemonizer, local_host_name, run_watchdog,
};
pub use supervisor::{Collaborators, Pause, Supervisor, ThreadPause, TickReport};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

#[cfg(test)]
mod tests;
