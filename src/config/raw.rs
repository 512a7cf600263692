use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;

use crate::Result;
use crate::error::ConfigError;
use crate::toast::ToastTimings;

use super::defaults::{
    default_audio_enabled, default_dismissed_capacity, default_poll_interval,
    default_store_backend, default_store_dir, default_toast_display, default_toast_transition,
};
use super::env::{env_bool, env_duration, env_parse, env_string};
use super::{AudioSettings, Config, HumantimeDuration, StorageBackend, StorageSettings};

pub(super) fn load(path: impl AsRef<Path>) -> std::result::Result<RawConfig, ConfigError> {
    let mut builder = ::config::Config::builder();
    let path = path.as_ref();
    builder = builder.add_source(::config::File::from(path).required(false));
    builder = builder.add_source(
        ::config::Environment::with_prefix("NOTIFEED")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .map_err(|err| ConfigError::Other(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Parse(err.to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub(super) poll: RawPoll,
    #[serde(default)]
    pub(super) toast: RawToast,
    #[serde(default)]
    pub(super) storage: RawStorage,
    #[serde(default)]
    pub(super) audio: RawAudio,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawPoll {
    #[serde(default = "default_poll_interval")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) interval: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawToast {
    #[serde(default = "default_toast_display")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) display: Duration,
    #[serde(default = "default_toast_transition")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) transition: Duration,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawStorage {
    #[serde(default = "default_store_backend")]
    pub(super) backend: String,
    #[serde(default = "default_store_dir")]
    pub(super) dir: PathBuf,
    #[serde(default = "default_dismissed_capacity")]
    pub(super) dismissed_capacity: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawAudio {
    #[serde(default = "default_audio_enabled")]
    pub(super) enabled: bool,
}

impl Default for RawPoll {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
        }
    }
}

impl Default for RawToast {
    fn default() -> Self {
        Self {
            display: default_toast_display(),
            transition: default_toast_transition(),
        }
    }
}

impl Default for RawStorage {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            dir: default_store_dir(),
            dismissed_capacity: default_dismissed_capacity(),
        }
    }
}

impl Default for RawAudio {
    fn default() -> Self {
        Self {
            enabled: default_audio_enabled(),
        }
    }
}

impl RawConfig {
    pub(super) fn apply_env_overrides(&mut self) -> std::result::Result<(), ConfigError> {
        if let Some(interval) = env_duration("POLL_INTERVAL")? {
            self.poll.interval = interval;
        }
        if let Some(display) = env_duration("TOAST_DISPLAY")? {
            self.toast.display = display;
        }
        if let Some(transition) = env_duration("TOAST_TRANSITION")? {
            self.toast.transition = transition;
        }
        if let Some(backend) = env_string("STORE_BACKEND")? {
            self.storage.backend = backend;
        }
        if let Some(dir) = env_string("STORE_DIR")? {
            self.storage.dir = PathBuf::from(dir);
        }
        if let Some(capacity) = env_parse::<usize>("DISMISSED_CAPACITY")? {
            self.storage.dismissed_capacity = capacity;
        }
        if let Some(enabled) = env_bool("AUDIO_CUE")? {
            self.audio.enabled = enabled;
        }
        Ok(())
    }

    pub(super) fn validate_and_build(self) -> Result<Config> {
        if self.poll.interval.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "poll.interval",
                message: "poll interval must be greater than zero".to_string(),
            }
            .into());
        }
        if self.toast.display.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "toast.display",
                message: "display duration must be greater than zero".to_string(),
            }
            .into());
        }
        if self.toast.transition.is_zero() || self.toast.transition >= self.toast.display {
            return Err(ConfigError::InvalidField {
                field: "toast.transition",
                message: format!(
                    "transition must be non-zero and shorter than the display time ({:?})",
                    self.toast.display
                ),
            }
            .into());
        }
        if self.storage.dismissed_capacity == 0 {
            return Err(ConfigError::InvalidField {
                field: "storage.dismissed_capacity",
                message: "capacity must be greater than zero".to_string(),
            }
            .into());
        }
        let backend = StorageBackend::from_str(self.storage.backend.trim()).map_err(|err| {
            ConfigError::InvalidField {
                field: "storage.backend",
                message: err,
            }
        })?;

        Ok(Config {
            poll_interval: self.poll.interval,
            toast: ToastTimings {
                display: self.toast.display,
                transition: self.toast.transition,
            },
            storage: StorageSettings {
                backend,
                dir: self.storage.dir,
                dismissed_capacity: self.storage.dismissed_capacity,
            },
            audio: AudioSettings {
                enabled: self.audio.enabled,
            },
        })
    }
}
