use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("invalid configuration for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("configuration error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage key {key:?}")]
    InvalidKey { key: String },
    #[error("storage I/O failed for key {key}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode value for key {key}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output available")]
    Unavailable,
    #[error("audio playback failed")]
    Playback {
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }
}
