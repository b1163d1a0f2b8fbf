//! Detaches the watchdog from its controlling terminal.

use std::ffi::OsStr;

use camino::Utf8Path;
use daemonize_me::Daemon;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Abstraction over daemonisation strategies.
pub trait Daemonizer {
    /// Detaches the process into the background, changing into `work_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonizeError`] when the process cannot be detached.
    fn daemonize(&self, work_dir: &Utf8Path) -> Result<(), DaemonizeError>;
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// System-level daemonisation failed.
    #[error("{0}")]
    System(#[from] daemonize_me::DaemonError),
}

/// Daemoniser that delegates to `daemonize-me`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDaemonizer;

impl Daemonizer for SystemDaemonizer {
    fn daemonize(&self, work_dir: &Utf8Path) -> Result<(), DaemonizeError> {
        info!(
            target: PROCESS_TARGET,
            work_dir = %work_dir,
            "detaching from terminal"
        );
        Daemon::new()
            .work_dir(work_dir.as_std_path())
            .name(OsStr::new(env!("CARGO_PKG_NAME")))
            .start()?;
        info!(target: PROCESS_TARGET, "running in background");
        Ok(())
    }
}
