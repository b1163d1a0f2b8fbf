//! The parsed watchdog configuration.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::str::FromStr;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::defaults::{
    DEFAULT_CHECK_INTERVAL, DEFAULT_MAX_RETRIES, MAX_GEN_LEN, MAX_LINE_BUF, MAX_PATH_LEN,
    default_log_filter_string,
};
use crate::error::ConfigError;
use crate::logging::LogFormat;
use crate::parser::{Entries, ParseError};
use crate::process::{MonitoredProcess, ProcessName};

const SHELL_KEY: &str = "shCmd";
const MAIL_KEY: &str = "mailCmd";
const ADDRESSES_KEY: &str = "EMAIL_ADDRESSES";
const CHECK_INTERVAL_KEY: &str = "PSADWATCHD_CHECK_INTERVAL";
const MAX_RETRIES_KEY: &str = "PSADWATCHD_MAX_RETRIES";
const PID_FILE_KEY: &str = "PSADWATCHD_PID_FILE";
const LOG_FILTER_KEY: &str = "PSADWATCHD_LOG_FILTER";
const LOG_FORMAT_KEY: &str = "PSADWATCHD_LOG_FORMAT";

const KNOWN_KEYS: [&str; 15] = [
    ProcessName::Psad.binary_key(),
    ProcessName::Psad.pid_file_key(),
    "PSAD_CMDLINE_FILE",
    ProcessName::Kmsgsd.binary_key(),
    ProcessName::Kmsgsd.pid_file_key(),
    ProcessName::Diskmond.binary_key(),
    ProcessName::Diskmond.pid_file_key(),
    SHELL_KEY,
    MAIL_KEY,
    ADDRESSES_KEY,
    CHECK_INTERVAL_KEY,
    MAX_RETRIES_KEY,
    PID_FILE_KEY,
    LOG_FILTER_KEY,
    LOG_FORMAT_KEY,
];

/// Paths describing how to find and restart one daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonPaths {
    /// Binary executed to restart the daemon.
    pub binary: Utf8PathBuf,
    /// File the daemon writes its process id to.
    pub pid_file: Utf8PathBuf,
    /// File holding the daemon's original arguments.
    pub cmdline_file: Option<Utf8PathBuf>,
}

impl DaemonPaths {
    fn under_run(binary: &str, pid_file: &str, cmdline_file: Option<&str>) -> Self {
        Self {
            binary: Utf8PathBuf::from(binary),
            pid_file: Utf8PathBuf::from(pid_file),
            cmdline_file: cmdline_file.map(Utf8PathBuf::from),
        }
    }
}

/// Settings for one run of the watchdog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Paths for the psad daemon.
    pub psad: DaemonPaths,
    /// Paths for the kmsgsd daemon.
    pub kmsgsd: DaemonPaths,
    /// Paths for the diskmond daemon.
    pub diskmond: DaemonPaths,
    /// Shell used to run the alert mail pipeline.
    pub shell_command: Utf8PathBuf,
    /// Mail command invoked by the alert pipeline.
    pub mail_command: String,
    /// Space-separated alert recipients.
    pub email_addresses: String,
    /// Seconds to sleep between ticks.
    pub check_interval_secs: u32,
    /// Consecutive failed restarts tolerated before giving up.
    pub max_retries: u32,
    /// Pid file of the watchdog itself.
    pub pid_file: Utf8PathBuf,
    /// Filter expression for diagnostics.
    pub log_filter: String,
    /// Output format for diagnostics.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            psad: DaemonPaths::under_run(
                "/usr/sbin/psad",
                "/var/run/psad.pid",
                Some("/var/run/psad.cmd"),
            ),
            kmsgsd: DaemonPaths::under_run("/usr/sbin/kmsgsd", "/var/run/kmsgsd.pid", None),
            diskmond: DaemonPaths::under_run("/usr/sbin/diskmond", "/var/run/diskmond.pid", None),
            shell_command: Utf8PathBuf::from("/bin/sh"),
            mail_command: "/bin/mail".to_owned(),
            email_addresses: "root@localhost".to_owned(),
            check_interval_secs: DEFAULT_CHECK_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            pid_file: Utf8PathBuf::from("/var/run/psadwatchd.pid"),
            log_filter: default_log_filter_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Loads the configuration stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be opened or read, when a
    /// required key is absent, or when a value is malformed.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(path, BufReader::new(file))
    }

    /// Parses configuration text read from `reader`.
    ///
    /// `origin` is only used to label errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] under the same conditions as [`Config::load`].
    pub fn from_reader<R: BufRead>(origin: &Utf8Path, reader: R) -> Result<Self, ConfigError> {
        let entries = Entries::parse(reader, &KNOWN_KEYS).map_err(|error| match error {
            ParseError::Io(source) => ConfigError::Read {
                path: origin.to_path_buf(),
                source,
            },
            ParseError::LineTooLong(line) => ConfigError::LineTooLong {
                path: origin.to_path_buf(),
                line,
                limit: MAX_LINE_BUF,
            },
        })?;
        let fields = Fields {
            origin,
            entries: &entries,
        };
        Ok(Self {
            psad: fields.daemon(ProcessName::Psad)?,
            kmsgsd: fields.daemon(ProcessName::Kmsgsd)?,
            diskmond: fields.daemon(ProcessName::Diskmond)?,
            shell_command: Utf8PathBuf::from(fields.required(SHELL_KEY, MAX_GEN_LEN)?),
            mail_command: fields.required(MAIL_KEY, MAX_GEN_LEN)?.to_owned(),
            email_addresses: fields.required(ADDRESSES_KEY, MAX_GEN_LEN)?.to_owned(),
            check_interval_secs: fields.number(CHECK_INTERVAL_KEY, 1)?,
            max_retries: fields.number(MAX_RETRIES_KEY, 0)?,
            pid_file: Utf8PathBuf::from(fields.required(PID_FILE_KEY, MAX_PATH_LEN)?),
            log_filter: fields
                .optional(LOG_FILTER_KEY, MAX_GEN_LEN)?
                .map_or_else(default_log_filter_string, str::to_owned),
            log_format: fields.log_format()?,
        })
    }

    /// Paths configured for `name`.
    #[must_use]
    pub const fn daemon(&self, name: ProcessName) -> &DaemonPaths {
        match name {
            ProcessName::Psad => &self.psad,
            ProcessName::Kmsgsd => &self.kmsgsd,
            ProcessName::Diskmond => &self.diskmond,
        }
    }

    /// The supervised daemons in check order.
    #[must_use]
    pub fn monitored_processes(&self) -> Vec<MonitoredProcess> {
        ProcessName::ALL
            .into_iter()
            .map(|name| {
                let paths = self.daemon(name);
                MonitoredProcess {
                    name,
                    pid_file: paths.pid_file.clone(),
                    cmdline_file: paths.cmdline_file.clone(),
                    binary: paths.binary.clone(),
                }
            })
            .collect()
    }

    /// Pause between supervisor ticks.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.check_interval_secs))
    }
}

struct Fields<'a> {
    origin: &'a Utf8Path,
    entries: &'a Entries,
}

impl Fields<'_> {
    fn daemon(&self, name: ProcessName) -> Result<DaemonPaths, ConfigError> {
        let cmdline_file = match name.cmdline_file_key() {
            Some(key) => self.optional(key, MAX_PATH_LEN)?.map(Utf8PathBuf::from),
            None => None,
        };
        Ok(DaemonPaths {
            binary: Utf8PathBuf::from(self.required(name.binary_key(), MAX_PATH_LEN)?),
            pid_file: Utf8PathBuf::from(self.required(name.pid_file_key(), MAX_PATH_LEN)?),
            cmdline_file,
        })
    }

    fn optional(&self, key: &'static str, limit: usize) -> Result<Option<&str>, ConfigError> {
        let Some(value) = self.entries.get(key) else {
            return Ok(None);
        };
        if value.len() > limit {
            return Err(ConfigError::TooLong {
                path: self.origin.to_path_buf(),
                key,
                limit,
            });
        }
        Ok(Some(value))
    }

    fn required(&self, key: &'static str, limit: usize) -> Result<&str, ConfigError> {
        self.optional(key, limit)?
            .ok_or_else(|| ConfigError::MissingKey {
                path: self.origin.to_path_buf(),
                key,
            })
    }

    fn number(&self, key: &'static str, minimum: u32) -> Result<u32, ConfigError> {
        let text = self.required(key, MAX_GEN_LEN)?;
        let value = text
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber {
                path: self.origin.to_path_buf(),
                key,
                value: text.to_owned(),
            })?;
        if value < minimum {
            return Err(ConfigError::OutOfRange {
                path: self.origin.to_path_buf(),
                key,
                value,
                minimum,
            });
        }
        Ok(value)
    }

    fn log_format(&self) -> Result<LogFormat, ConfigError> {
        let Some(text) = self.optional(LOG_FORMAT_KEY, MAX_GEN_LEN)? else {
            return Ok(LogFormat::default());
        };
        LogFormat::from_str(text).map_err(|source| ConfigError::LogFormat {
            path: self.origin.to_path_buf(),
            key: LOG_FORMAT_KEY,
            value: text.to_owned(),
            source,
        })
    }
}
