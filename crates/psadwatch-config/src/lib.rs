//! Configuration model shared by the `psadwatchd` watchdog.
//!
//! The watchdog reads a line-oriented `KEY value` file. Comment lines start
//! with `#` or `;`, blank lines are ignored, and unknown keys are skipped so a
//! single file can be shared with the daemons being supervised. [`Config`]
//! captures the parsed settings, while [`ConfigStore`] owns the active
//! configuration together with the modification time it was loaded at, so the
//! supervisor loop can swap in a fresh copy whenever the file changes on disk.
//!
//! Every key the watchdog depends on is required. A missing key or a numeric
//! value that does not parse is reported as a [`ConfigError`]; nothing is
//! defaulted at load time.

mod config;
mod defaults;
mod error;
mod line;
mod logging;
mod parser;
mod process;
mod store;

pub use config::{Config, DaemonPaths};
pub use defaults::{
    DEFAULT_CHECK_INTERVAL, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER, DEFAULT_MAX_RETRIES,
    MAX_GEN_LEN, MAX_LINE_BUF, MAX_PATH_LEN,
};
pub use error::ConfigError;
pub use line::{BoundedLine, read_bounded_line};
pub use logging::{LogFormat, LogFormatParseError};
pub use process::{MonitoredProcess, ProcessName};
pub use store::{ConfigStore, ConfigWatchState, has_changed};
