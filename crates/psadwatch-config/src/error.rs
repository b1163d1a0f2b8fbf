use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::logging::LogFormatParseError;

/// Errors raised while loading or watching the configuration file.
///
/// All of them are fatal to the watchdog: they abort startup, or end the
/// supervisor loop when a reload fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be opened.
    #[error("could not open config file '{path}': {source}")]
    Open {
        /// Config file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading a line from the config file failed.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Config file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The config file's modification time could not be read.
    #[error("could not get mtime for config file '{path}': {source}")]
    Metadata {
        /// Config file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A key the watchdog depends on was absent or empty.
    #[error("config file '{path}' does not set required key {key}")]
    MissingKey {
        /// Config file path.
        path: Utf8PathBuf,
        /// Name of the absent key.
        key: &'static str,
    },
    /// A numeric key held something other than a base-10 integer.
    #[error("config key {key} in '{path}' is not a base-10 integer: '{value}'")]
    InvalidNumber {
        /// Config file path.
        path: Utf8PathBuf,
        /// Name of the offending key.
        key: &'static str,
        /// Text found in the file.
        value: String,
    },
    /// A numeric key parsed but is outside the accepted range.
    #[error("config key {key} in '{path}' must be at least {minimum}, found {value}")]
    OutOfRange {
        /// Config file path.
        path: Utf8PathBuf,
        /// Name of the offending key.
        key: &'static str,
        /// Parsed value.
        value: u32,
        /// Smallest accepted value.
        minimum: u32,
    },
    /// A line of the config file exceeded [`crate::MAX_LINE_BUF`].
    #[error("line {line} of config file '{path}' is longer than {limit} bytes")]
    LineTooLong {
        /// Config file path.
        path: Utf8PathBuf,
        /// One-based number of the offending line.
        line: usize,
        /// Line length ceiling.
        limit: usize,
    },
    /// A value exceeded its length ceiling.
    #[error("config key {key} in '{path}' is longer than {limit} bytes")]
    TooLong {
        /// Config file path.
        path: Utf8PathBuf,
        /// Name of the offending key.
        key: &'static str,
        /// Length ceiling for the key.
        limit: usize,
    },
    /// The log format key named an unsupported format.
    #[error("config key {key} in '{path}' names an unknown log format '{value}': {source}")]
    LogFormat {
        /// Config file path.
        path: Utf8PathBuf,
        /// Name of the offending key.
        key: &'static str,
        /// Text found in the file.
        value: String,
        /// Underlying parse error.
        #[source]
        source: LogFormatParseError,
    },
}

impl ConfigError {
    /// Path of the config file the error refers to.
    #[must_use]
    pub fn path(&self) -> &camino::Utf8Path {
        match self {
            Self::Open { path, .. }
            | Self::Read { path, .. }
            | Self::Metadata { path, .. }
            | Self::MissingKey { path, .. }
            | Self::InvalidNumber { path, .. }
            | Self::OutOfRange { path, .. }
            | Self::LineTooLong { path, .. }
            | Self::TooLong { path, .. }
            | Self::LogFormat { path, .. } => path,
        }
    }
}
