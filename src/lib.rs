#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod audio;
pub mod center;
pub mod config;
pub mod error;
pub mod feed;
pub mod panel;
pub mod poller;
pub mod storage;
pub mod telemetry;
pub mod toast;
pub mod types;

pub type Result<T> = std::result::Result<T, error::Error>;
