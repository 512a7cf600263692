use std::path::PathBuf;
use std::time::Duration;

use crate::poller::DEFAULT_PERIOD;
use crate::toast::{DEFAULT_DISPLAY, DEFAULT_TRANSITION};

pub(super) const fn default_poll_interval() -> Duration {
    DEFAULT_PERIOD
}

pub(super) const fn default_toast_display() -> Duration {
    DEFAULT_DISPLAY
}

pub(super) const fn default_toast_transition() -> Duration {
    DEFAULT_TRANSITION
}

pub(super) fn default_store_backend() -> String {
    "file".to_string()
}

pub(super) fn default_store_dir() -> PathBuf {
    PathBuf::from(".notifeed")
}

pub(super) const fn default_dismissed_capacity() -> usize {
    512
}

pub(super) const fn default_audio_enabled() -> bool {
    true
}
