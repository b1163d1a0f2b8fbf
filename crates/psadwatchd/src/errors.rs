//! Defines the unified error surface for the watchdog.

use std::io;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use nix::errno::Errno;
use psadwatch_config::{ConfigError, ProcessName};
use thiserror::Error;

use crate::launcher::LaunchError;
use crate::process::DaemonizeError;
use crate::telemetry::TelemetryError;

/// Errors that terminate the watchdog.
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// Configuration failed to load or reload.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying configuration error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry could not be initialised.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Another watchdog already owns the pid file.
    #[error("psadwatchd already running with pid {pid} (pid file '{path}')")]
    AlreadyRunning {
        /// PID recorded in the existing pid file.
        pid: u32,
        /// Pid file path.
        path: Utf8PathBuf,
    },
    /// Probing the pid recorded by a previous watchdog failed.
    #[error("failed to check existing process {pid}: {source}")]
    CheckProcess {
        /// PID that failed to probe.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Removing a stale pid file failed.
    #[error("failed to remove stale pid file '{path}': {source}")]
    Cleanup {
        /// Pid file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the watchdog pid file failed.
    #[error("failed to write pid file '{path}': {source}")]
    PidWrite {
        /// Pid file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The current directory could not be determined.
    #[error("failed to resolve working directory: {source}")]
    WorkDir {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The current directory is not valid UTF-8.
    #[error("working directory '{}' is not valid UTF-8", path.display())]
    NonUtf8WorkDir {
        /// The offending directory.
        path: PathBuf,
    },
    /// Daemonisation failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Underlying daemonisation error.
        #[source]
        source: DaemonizeError,
    },
    /// A daemon could not be restarted.
    #[error("failed to restart {process}: {source}")]
    Launch {
        /// Daemon being restarted.
        process: ProcessName,
        /// Underlying launch error.
        #[source]
        source: LaunchError,
    },
    /// A daemon exhausted its restart attempts.
    #[error("could not restart {process} after {attempts} attempts")]
    RestartExhausted {
        /// Daemon that kept failing.
        process: ProcessName,
        /// Consecutive failed checks recorded.
        attempts: u32,
    },
}

impl From<ConfigError> for WatchdogError {
    fn from(source: ConfigError) -> Self {
        Self::Config { source }
    }
}

impl From<TelemetryError> for WatchdogError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<DaemonizeError> for WatchdogError {
    fn from(source: DaemonizeError) -> Self {
        Self::Daemonize { source }
    }
}
