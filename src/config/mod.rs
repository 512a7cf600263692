use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::Result;
use crate::error::Error as FeedError;
use crate::toast::ToastTimings;

mod defaults;
mod env;
mod raw;
mod serde;

pub(crate) use serde::HumantimeDuration;

#[derive(Debug, Clone)]
pub struct Config {
    pub poll_interval: Duration,
    pub toast: ToastTimings,
    pub storage: StorageSettings,
    pub audio: AudioSettings,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub dir: PathBuf,
    pub dismissed_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSettings {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Memory,
}

impl Config {
    /// Load configuration from a file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration file cannot be parsed, when
    /// environment overrides are invalid, or when the resulting values fail
    /// validation.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut raw = raw::load(path).map_err(FeedError::from)?;
        raw.apply_env_overrides().map_err(FeedError::from)?;
        raw.validate_and_build()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: defaults::default_poll_interval(),
            toast: ToastTimings {
                display: defaults::default_toast_display(),
                transition: defaults::default_toast_transition(),
            },
            storage: StorageSettings {
                backend: StorageBackend::File,
                dir: defaults::default_store_dir(),
                dismissed_capacity: defaults::default_dismissed_capacity(),
            },
            audio: AudioSettings { enabled: true },
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Memory => "memory",
        })
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "fs" => Ok(Self::File),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, StorageBackend};
    use std::str::FromStr;
    use std::time::Duration;

    #[test]
    fn defaults_match_dashboard_timings() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.toast.display, Duration::from_secs(3));
        assert_eq!(config.toast.transition, Duration::from_millis(300));
        assert_eq!(config.storage.backend, StorageBackend::File);
    }

    #[test]
    fn storage_backend_from_str_accepts_aliases() {
        assert_eq!(StorageBackend::from_str("MEM"), Ok(StorageBackend::Memory));
        assert_eq!(StorageBackend::from_str("file"), Ok(StorageBackend::File));
        assert!(StorageBackend::from_str("s3").is_err());
    }
}
