use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tempfile::Builder;
use tracing::{info, warn};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::PROCESS_TARGET;
use crate::errors::WatchdogError;
use crate::pidfile::parse_pid;

/// Single-instance guard backed by the watchdog's own pid file.
///
/// The pid file is removed on drop once it has been written.
#[derive(Debug)]
pub(crate) struct InstanceGuard {
    path: Utf8PathBuf,
    written: bool,
}

impl InstanceGuard {
    /// Claims `path`, refusing when it names a live watchdog and clearing it
    /// when the recorded process has gone.
    pub(crate) fn acquire(path: &Utf8Path) -> Result<Self, WatchdogError> {
        if let Some(pid) = recorded_pid(path) {
            if check_process(pid)? {
                info!(
                    target: PROCESS_TARGET,
                    pid,
                    file = %path,
                    "refusing to start: existing watchdog alive"
                );
                return Err(WatchdogError::AlreadyRunning {
                    pid,
                    path: path.to_path_buf(),
                });
            }
            warn!(
                target: PROCESS_TARGET,
                pid,
                file = %path,
                "existing watchdog not detected; removing stale pid file"
            );
        }
        remove_stale(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            written: false,
        })
    }

    /// Records `pid` in the guarded file.
    pub(crate) fn write_pid(&mut self, pid: u32) -> Result<(), WatchdogError> {
        atomic_write(&self.path, format!("{pid}\n").as_bytes()).map_err(|source| {
            WatchdogError::PidWrite {
                path: self.path.clone(),
                source,
            }
        })?;
        self.written = true;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %self.path,
            "pid file written"
        );
        Ok(())
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        if !self.written {
            return;
        }
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: PROCESS_TARGET,
                    file = %self.path,
                    error = %error,
                    "failed to remove pid file"
                );
            }
            _ => {}
        }
    }
}

fn recorded_pid(path: &Utf8Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    let pid = parse_pid(content.lines().next()?)?;
    u32::try_from(pid.as_raw()).ok()
}

fn remove_stale(path: &Utf8Path) -> Result<(), WatchdogError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WatchdogError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// EPERM still proves the process exists, so it blocks a second instance.
fn check_process(pid: u32) -> Result<bool, WatchdogError> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(errno) => Err(WatchdogError::CheckProcess { pid, source: errno }),
    }
}

/// Writes `contents` to `path` through a temporary sibling renamed into place.
fn atomic_write(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "pid file path did not have a parent directory",
        )
    })?;
    let directory = if directory.as_str().is_empty() {
        Utf8Path::new(".")
    } else {
        directory
    };

    let mut builder = Builder::new();
    builder.prefix(path.file_name().unwrap_or(env!("CARGO_PKG_NAME")));
    #[cfg(unix)]
    {
        builder.permissions(fs::Permissions::from_mode(0o644));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
