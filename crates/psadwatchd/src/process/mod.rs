//! Process-level lifecycle: single instance, detachment and the entry point.

mod daemonizer;
mod guard;
mod run;

use nix::unistd::gethostname;
use tracing::warn;

pub use daemonizer::{DaemonizeError, Daemonizer, SystemDaemonizer};
pub use run::{LaunchMode, run_watchdog};
#[cfg(test)]
pub(crate) use run::{WatchdogPlan, run_watchdog_with};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
pub(crate) const FOREGROUND_ENV_VAR: &str = "PSADWATCHD_FOREGROUND";
const FALLBACK_HOST_NAME: &str = "localhost";

/// Name of this host as used in alert subjects.
///
/// Falls back to `localhost` when the name cannot be read or is not UTF-8.
#[must_use]
pub fn local_host_name() -> String {
    match gethostname().map(|name| name.into_string()) {
        Ok(Ok(name)) if !name.is_empty() => name,
        Ok(_) => FALLBACK_HOST_NAME.to_owned(),
        Err(errno) => {
            warn!(
                target: PROCESS_TARGET,
                errno = %errno,
                "failed to read host name"
            );
            FALLBACK_HOST_NAME.to_owned()
        }
    }
}
