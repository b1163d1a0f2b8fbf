//! Ownership of the active configuration and hot-reload detection.

use std::fs;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::Config;
use crate::error::ConfigError;

/// Modification time of the config file when it was last loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigWatchState {
    modified: SystemTime,
}

impl ConfigWatchState {
    /// Records the current modification time of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Metadata`] when the file cannot be inspected.
    pub fn observe(path: &Utf8Path) -> Result<Self, ConfigError> {
        Ok(Self {
            modified: modification_time(path)?,
        })
    }

    /// The recorded modification time.
    #[must_use]
    pub const fn modified(&self) -> SystemTime {
        self.modified
    }
}

/// Reports whether the modification time of `path` differs from `last`.
///
/// # Errors
///
/// Returns [`ConfigError::Metadata`] when the file cannot be inspected.
pub fn has_changed(path: &Utf8Path, last: SystemTime) -> Result<bool, ConfigError> {
    Ok(modification_time(path)? != last)
}

fn modification_time(path: &Utf8Path) -> Result<SystemTime, ConfigError> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| ConfigError::Metadata {
            path: path.to_path_buf(),
            source,
        })
}

/// The active configuration and the file it was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: Utf8PathBuf,
    config: Config,
    watch: ConfigWatchState,
}

impl ConfigStore {
    /// Loads the configuration stored at `path` and starts watching it.
    ///
    /// The modification time is captured before parsing so an edit made
    /// while the file is being read triggers a reload on the next check.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be inspected or parsed.
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let watch = ConfigWatchState::observe(&path)?;
        let config = Config::load(&path)?;
        Ok(Self {
            path,
            config,
            watch,
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The modification time recorded at the last load.
    #[must_use]
    pub const fn watch_state(&self) -> ConfigWatchState {
        self.watch
    }

    /// Reloads the configuration when the backing file has been modified.
    ///
    /// Returns `true` when a new configuration was installed. The
    /// configuration and watch state are replaced together, and only after
    /// the new file parsed successfully.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be inspected or the new
    /// contents fail to parse.
    pub fn reload_if_changed(&mut self) -> Result<bool, ConfigError> {
        if !has_changed(&self.path, self.watch.modified)? {
            return Ok(false);
        }
        let watch = ConfigWatchState::observe(&self.path)?;
        let config = Config::load(&self.path)?;
        self.config = config;
        self.watch = watch;
        Ok(true)
    }
}
