//! Built-in defaults and length ceilings for configuration values.

/// Config file consulted when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/psad/psadwatchd.conf";

/// Seconds between supervisor ticks used by [`crate::Config::default`].
pub const DEFAULT_CHECK_INTERVAL: u32 = 5;

/// Consecutive failed restarts tolerated by [`crate::Config::default`].
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default log filter expression used by the watchdog.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Longest accepted value for a path-valued key, in bytes.
pub const MAX_PATH_LEN: usize = 100;

/// Longest accepted value for the shell, mail, and recipient keys, in bytes.
pub const MAX_GEN_LEN: usize = 256;

/// Longest accepted line in the config, pid, and command-line files, in
/// bytes, excluding the line terminator.
pub const MAX_LINE_BUF: usize = 1024;

pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}
