//! Startup sequencing for the watchdog process.

use std::convert::Infallible;
use std::env;

use camino::{Utf8Path, Utf8PathBuf};
use psadwatch_config::ConfigStore;
use tracing::info;

use super::daemonizer::{Daemonizer, SystemDaemonizer};
use super::guard::InstanceGuard;
use super::{FOREGROUND_ENV_VAR, PROCESS_TARGET, local_host_name};
use crate::alert::{AlertNotifier, MailNotifier};
use crate::errors::WatchdogError;
use crate::launcher::{ProcessLauncher, SystemLauncher};
use crate::monitor::{LivenessProbe, SignalProbe};
use crate::supervisor::{Collaborators, Pause, Supervisor, ThreadPause};
use crate::telemetry;

/// Launch mode for the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal.
    Foreground,
}

impl LaunchMode {
    /// Chooses [`LaunchMode::Foreground`] when `PSADWATCHD_FOREGROUND` is set.
    #[must_use]
    pub fn detect() -> Self {
        if env::var_os(FOREGROUND_ENV_VAR).is_some() {
            Self::Foreground
        } else {
            Self::Background
        }
    }
}

/// Collaborators required to start the watchdog.
pub(crate) struct WatchdogPlan<D, P, L, N, S> {
    pub(crate) mode: LaunchMode,
    pub(crate) daemonizer: D,
    pub(crate) host: String,
    pub(crate) collaborators: Collaborators<P, L, N, S>,
}

/// Runs the watchdog with the production collaborators.
///
/// # Errors
///
/// Returns [`WatchdogError`] on any fatal condition; the watchdog never stops
/// successfully.
pub fn run_watchdog(config_path: &Utf8Path) -> Result<Infallible, WatchdogError> {
    let plan = WatchdogPlan {
        mode: LaunchMode::detect(),
        daemonizer: SystemDaemonizer,
        host: local_host_name(),
        collaborators: Collaborators {
            probe: SignalProbe,
            launcher: SystemLauncher,
            notifier: MailNotifier,
            pause: ThreadPause,
        },
    };
    run_watchdog_with(config_path, plan)
}

/// Runs the watchdog with injected collaborators.
pub(crate) fn run_watchdog_with<D, P, L, N, S>(
    config_path: &Utf8Path,
    plan: WatchdogPlan<D, P, L, N, S>,
) -> Result<Infallible, WatchdogError>
where
    D: Daemonizer,
    P: LivenessProbe,
    L: ProcessLauncher,
    N: AlertNotifier,
    S: Pause,
{
    let WatchdogPlan {
        mode,
        daemonizer,
        host,
        collaborators,
    } = plan;

    let store = ConfigStore::open(config_path)?;
    telemetry::initialise(store.config())?;
    info!(
        target: PROCESS_TARGET,
        ?mode,
        config = %store.path(),
        host = %host,
        "starting watchdog"
    );

    let mut guard = InstanceGuard::acquire(&store.config().pid_file)?;
    if matches!(mode, LaunchMode::Background) {
        daemonizer.daemonize(&working_directory()?)?;
    }
    guard.write_pid(std::process::id())?;

    Supervisor::new(store, host, collaborators).run()
}

// Relative paths in the configuration keep resolving after detaching.
fn working_directory() -> Result<Utf8PathBuf, WatchdogError> {
    let current = env::current_dir().map_err(|source| WatchdogError::WorkDir { source })?;
    Utf8PathBuf::from_path_buf(current).map_err(|path| WatchdogError::NonUtf8WorkDir { path })
}
