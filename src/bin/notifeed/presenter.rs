use std::time::Duration;

use notifeed::toast::ToastState;
use notifeed::types::ToastKind;
use tokio::sync::watch;
use tracing::{info, warn};

const APP_NAME: &str = "Notifeed";

/// Reproduit chaque nouveau toast visible sur le bureau jusqu'à la
/// disparition du contrôleur.
pub async fn run_presenter(mut rx: watch::Receiver<ToastState>, display: Duration, dry_run: bool) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if !state.visible {
            continue;
        }
        info!(kind = %state.kind, message = %state.message, "toast shown");
        if dry_run {
            continue;
        }
        if let Err(err) = backend::show(&state, display) {
            warn!(error = %err, "desktop toast failed");
        }
    }
}

#[cfg(target_os = "linux")]
mod backend {
    use std::time::Duration;

    use notify_rust::{Notification, Timeout, Urgency};

    use super::{APP_NAME, ToastKind, ToastState};

    pub fn show(state: &ToastState, display: Duration) -> Result<(), notify_rust::error::Error> {
        let timeout = u32::try_from(display.as_millis()).map_or(Timeout::Default, Timeout::Milliseconds);
        Notification::new()
            .appname(APP_NAME)
            .summary(summary(state.kind))
            .body(&state.message)
            .urgency(match state.kind {
                ToastKind::Error => Urgency::Critical,
                ToastKind::Success | ToastKind::Info => Urgency::Normal,
            })
            .timeout(timeout)
            .show()
            .map(|_| ())
    }

    const fn summary(kind: ToastKind) -> &'static str {
        match kind {
            ToastKind::Success => "Done",
            ToastKind::Error => "Something went wrong",
            ToastKind::Info => "Notifications",
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod backend {
    use std::time::Duration;

    use super::{APP_NAME, ToastKind, ToastState};

    pub fn show(state: &ToastState, display: Duration) -> Result<(), std::convert::Infallible> {
        let level = match state.kind {
            ToastKind::Error => "error",
            ToastKind::Success | ToastKind::Info => "info",
        };
        tracing::debug!(app = APP_NAME, level, ?display, "no desktop toast backend on this platform");
        Ok(())
    }
}
