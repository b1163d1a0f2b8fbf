//! Restarting daemons from their binary and recorded arguments.

use std::fs::File;
use std::io::{self, BufReader};
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use psadwatch_config::{BoundedLine, MAX_LINE_BUF, read_bounded_line};
use thiserror::Error;
use tracing::{info, warn};

const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launcher");

/// Largest argument vector accepted for a restart, including the binary.
pub const MAX_ARG_LEN: usize = 30;

/// Errors raised while rebuilding a command line or running the binary.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The command-line file could not be opened.
    #[error("failed to open command-line file '{path}': {source}")]
    CmdlineOpen {
        /// Command-line file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading the command-line file failed.
    #[error("failed to read command-line file '{path}': {source}")]
    CmdlineRead {
        /// Command-line file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The command-line file had no first line.
    #[error("command-line file '{path}' is empty")]
    EmptyCmdline {
        /// Command-line file path.
        path: Utf8PathBuf,
    },
    /// The first line of the command-line file exceeds [`MAX_LINE_BUF`].
    #[error("command-line file '{path}' has a first line longer than {limit} bytes")]
    CmdlineTooLong {
        /// Command-line file path.
        path: Utf8PathBuf,
        /// Line length ceiling.
        limit: usize,
    },
    /// The recorded arguments exceed [`MAX_ARG_LEN`].
    #[error("command-line file '{path}' yields {count} arguments; at most {limit} are supported")]
    TooManyArguments {
        /// Command-line file path.
        path: Utf8PathBuf,
        /// Size of the rebuilt argument vector.
        count: usize,
        /// Largest supported argument vector.
        limit: usize,
    },
    /// The binary could not be spawned or waited on.
    #[error("failed to run '{binary}': {source}")]
    Spawn {
        /// Binary that failed to run.
        binary: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Splits a recorded command line into arguments on runs of spaces, tabs, and
/// line-ending characters.
pub fn tokenize(line: &str) -> impl Iterator<Item = &str> {
    line.split([' ', '\t', '\r', '\n'])
        .filter(|token| !token.is_empty())
}

/// Argument vector used to restart a daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    binary: Utf8PathBuf,
    args: Vec<String>,
}

impl CommandLine {
    /// Builds the argument vector for `binary`, appending the arguments
    /// recorded on the first line of `cmdline_file` when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the file cannot be read, is empty, has a
    /// first line longer than [`MAX_LINE_BUF`], or holds more arguments than
    /// [`MAX_ARG_LEN`] allows.
    pub fn build(binary: &Utf8Path, cmdline_file: Option<&Utf8Path>) -> Result<Self, LaunchError> {
        let args = match cmdline_file {
            Some(path) => recorded_arguments(path)?,
            None => Vec::new(),
        };
        if let Some(path) = cmdline_file
            && args.len() >= MAX_ARG_LEN
        {
            return Err(LaunchError::TooManyArguments {
                path: path.to_path_buf(),
                count: args.len() + 1,
                limit: MAX_ARG_LEN,
            });
        }
        Ok(Self {
            binary: binary.to_path_buf(),
            args,
        })
    }

    /// Binary executed as `argv[0]`.
    #[must_use]
    pub fn binary(&self) -> &Utf8Path {
        &self.binary
    }

    /// Arguments following `argv[0]`.
    #[must_use]
    pub const fn args(&self) -> &[String] {
        self.args.as_slice()
    }

    /// The full argument vector, starting with the binary path.
    #[must_use]
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.binary.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

fn recorded_arguments(path: &Utf8Path) -> Result<Vec<String>, LaunchError> {
    let file = File::open(path).map_err(|source| LaunchError::CmdlineOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let read = read_bounded_line(&mut BufReader::new(file), MAX_LINE_BUF).map_err(|source| {
        LaunchError::CmdlineRead {
            path: path.to_path_buf(),
            source,
        }
    })?;
    match read {
        BoundedLine::Line(line) => Ok(tokenize(&line).map(str::to_owned).collect()),
        BoundedLine::Eof => Err(LaunchError::EmptyCmdline {
            path: path.to_path_buf(),
        }),
        BoundedLine::TooLong => Err(LaunchError::CmdlineTooLong {
            path: path.to_path_buf(),
            limit: MAX_LINE_BUF,
        }),
    }
}

/// How a restarted binary finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchReport {
    /// Exit code, or `None` when the child was killed by a signal.
    pub exit_code: Option<i32>,
}

impl LaunchReport {
    /// Whether the child exited with status zero.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Starts a replacement daemon and waits for the launched process to exit.
pub trait ProcessLauncher {
    /// Runs `binary` with the arguments recorded in `cmdline_file`, blocking
    /// until the spawned process exits.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the command line cannot be rebuilt or the
    /// binary cannot be run.
    fn launch_and_wait(
        &self,
        binary: &Utf8Path,
        cmdline_file: Option<&Utf8Path>,
    ) -> Result<LaunchReport, LaunchError>;
}

/// Launcher that executes binaries with an empty environment.
///
/// The wait has no timeout: a binary that never detaches stalls the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch_and_wait(
        &self,
        binary: &Utf8Path,
        cmdline_file: Option<&Utf8Path>,
    ) -> Result<LaunchReport, LaunchError> {
        let command_line = CommandLine::build(binary, cmdline_file)?;
        info!(
            target: LAUNCH_TARGET,
            argv = ?command_line.argv(),
            "restarting daemon"
        );
        let status = Command::new(command_line.binary())
            .args(command_line.args())
            .env_clear()
            .status()
            .map_err(|source| LaunchError::Spawn {
                binary: binary.to_path_buf(),
                source,
            })?;
        let report = LaunchReport {
            exit_code: status.code(),
        };
        if !report.succeeded() {
            warn!(
                target: LAUNCH_TARGET,
                binary = %binary,
                exit_code = ?report.exit_code,
                "restarted binary exited unsuccessfully"
            );
        }
        Ok(report)
    }
}
