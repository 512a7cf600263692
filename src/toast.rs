//! Affichage des toasts, un seul à la fois.
//!
//! Le contrôleur est une machine à quatre états (`Idle`, `Showing`, `Hiding`,
//! `HidingForNext`). Chaque transition incrémente une époque et annule le timer
//! en attente : un timer n'agit que si aucune transition n'a eu lieu depuis
//! qu'il a été armé. Les présentateurs suivent [`ToastState`] via un canal watch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::types::ToastKind;

pub const DEFAULT_DISPLAY: Duration = Duration::from_secs(3);
pub const DEFAULT_TRANSITION: Duration = Duration::from_millis(300);

/// Ce que les présentateurs affichent. Au plus un message à la fois.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ToastState {
    pub visible: bool,
    pub animating: bool,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ToastKind,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ToastPhase {
    Idle,
    Showing,
    Hiding,
    HidingForNext,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ToastTimings {
    pub display: Duration,
    pub transition: Duration,
}

impl Default for ToastTimings {
    fn default() -> Self {
        Self {
            display: DEFAULT_DISPLAY,
            transition: DEFAULT_TRANSITION,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Timer {
    AutoHide,
    RevealQueued,
    Settle,
}

struct Inner {
    phase: ToastPhase,
    state: ToastState,
    queued: Option<(String, ToastKind)>,
    pending: Option<JoinHandle<()>>,
    epoch: u64,
    closed: bool,
}

/// Poignée clonable ; tous les clones pilotent le même emplacement.
///
/// Les transitions temporisées sont lancées sur le runtime tokio courant.
#[derive(Clone)]
pub struct ToastController {
    inner: Arc<Mutex<Inner>>,
    state_tx: Arc<watch::Sender<ToastState>>,
    timings: ToastTimings,
}

impl ToastController {
    #[must_use]
    pub fn new(timings: ToastTimings) -> Self {
        let (state_tx, _) = watch::channel(ToastState::default());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                phase: ToastPhase::Idle,
                state: ToastState::default(),
                queued: None,
                pending: None,
                epoch: 0,
                closed: false,
            })),
            state_tx: Arc::new(state_tx),
            timings,
        }
    }

    #[must_use]
    pub fn state(&self) -> ToastState {
        self.lock().state.clone()
    }

    #[must_use]
    pub fn phase(&self) -> ToastPhase {
        self.lock().phase
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ToastState> {
        self.state_tx.subscribe()
    }

    /// Affiche `message`, en remplaçant le toast visible après la transition
    /// de masquage.
    pub fn enqueue(&self, message: impl Into<String>, kind: ToastKind) {
        let message = message.into();
        let mut inner = self.lock();
        if inner.closed {
            debug!(%message, "toast controller shut down; dropping message");
            return;
        }
        match inner.phase {
            ToastPhase::Idle => self.show(&mut inner, message, kind),
            ToastPhase::Showing | ToastPhase::Hiding | ToastPhase::HidingForNext => {
                let state = ToastState {
                    visible: false,
                    animating: true,
                    ..inner.state.clone()
                };
                inner.queued = Some((message, kind));
                self.transition(&mut inner, ToastPhase::HidingForNext, state);
                self.arm(&mut inner, self.timings.transition, Timer::RevealQueued);
            }
        }
    }

    /// Fermeture par l'utilisateur ; écourte le temps d'affichage restant.
    pub fn dismiss(&self) {
        let mut inner = self.lock();
        match inner.phase {
            ToastPhase::Showing | ToastPhase::HidingForNext => {
                inner.queued = None;
                self.begin_hide(&mut inner);
            }
            ToastPhase::Idle | ToastPhase::Hiding => {}
        }
    }

    /// Annule les timers en attente et revient à l'état masqué. Les appels
    /// suivants à `enqueue` sont ignorés.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.queued = None;
        self.transition(&mut inner, ToastPhase::Idle, ToastState::default());
    }

    fn show(&self, inner: &mut Inner, message: String, kind: ToastKind) {
        trace!(%message, %kind, "showing toast");
        let state = ToastState {
            visible: true,
            animating: false,
            message,
            kind,
        };
        self.transition(inner, ToastPhase::Showing, state);
        self.arm(inner, self.timings.display, Timer::AutoHide);
    }

    fn begin_hide(&self, inner: &mut Inner) {
        let state = ToastState {
            visible: false,
            animating: true,
            ..inner.state.clone()
        };
        self.transition(inner, ToastPhase::Hiding, state);
        self.arm(inner, self.timings.transition, Timer::Settle);
    }

    fn transition(&self, inner: &mut Inner, phase: ToastPhase, state: ToastState) {
        inner.epoch = inner.epoch.wrapping_add(1);
        if let Some(handle) = inner.pending.take() {
            handle.abort();
        }
        inner.phase = phase;
        inner.state = state;
        self.state_tx.send_replace(inner.state.clone());
    }

    fn arm(&self, inner: &mut Inner, after: Duration, timer: Timer) {
        let epoch = inner.epoch;
        let this = self.clone();
        inner.pending = Some(tokio::spawn(async move {
            sleep(after).await;
            this.fire(epoch, timer);
        }));
    }

    fn fire(&self, epoch: u64, timer: Timer) {
        let mut inner = self.lock();
        if inner.epoch != epoch || inner.closed {
            trace!(?timer, "stale toast timer ignored");
            return;
        }
        // the handle belongs to this very task; drop it instead of aborting
        inner.pending = None;
        match (timer, inner.phase) {
            (Timer::AutoHide, ToastPhase::Showing) => self.begin_hide(&mut inner),
            (Timer::RevealQueued, ToastPhase::HidingForNext) => {
                if let Some((message, kind)) = inner.queued.take() {
                    self.show(&mut inner, message, kind);
                } else {
                    let state = settled(&inner.state);
                    self.transition(&mut inner, ToastPhase::Idle, state);
                }
            }
            (Timer::Settle, ToastPhase::Hiding) => {
                let state = settled(&inner.state);
                self.transition(&mut inner, ToastPhase::Idle, state);
            }
            (timer, phase) => debug!(?timer, ?phase, "toast timer does not apply"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ToastController {
    fn default() -> Self {
        Self::new(ToastTimings::default())
    }
}

fn settled(state: &ToastState) -> ToastState {
    ToastState {
        visible: false,
        animating: false,
        ..state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{ToastController, ToastPhase, ToastTimings};
    use crate::types::ToastKind;
    use std::time::Duration;
    use tokio::time::sleep;

    fn controller() -> ToastController {
        ToastController::new(ToastTimings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_from_idle_shows_then_auto_hides() {
        let toasts = controller();
        toasts.enqueue("Saved", ToastKind::Success);
        let state = toasts.state();
        assert!(state.visible);
        assert!(!state.animating);
        assert_eq!(state.message, "Saved");
        assert_eq!(toasts.phase(), ToastPhase::Showing);

        sleep(Duration::from_millis(3_010)).await;
        assert_eq!(toasts.phase(), ToastPhase::Hiding);
        assert!(!toasts.state().visible);
        assert!(toasts.state().animating);

        sleep(Duration::from_millis(300)).await;
        assert_eq!(toasts.phase(), ToastPhase::Idle);
        assert!(!toasts.state().animating);
    }

    #[tokio::test(start_paused = true)]
    async fn replacement_hides_before_showing_next() {
        let toasts = controller();
        toasts.enqueue("A", ToastKind::Info);
        sleep(Duration::from_millis(100)).await;
        toasts.enqueue("B", ToastKind::Error);

        let state = toasts.state();
        assert_eq!(toasts.phase(), ToastPhase::HidingForNext);
        assert!(!state.visible);
        assert!(state.animating);
        assert_eq!(state.message, "A");

        sleep(Duration::from_millis(310)).await;
        let state = toasts.state();
        assert_eq!(toasts.phase(), ToastPhase::Showing);
        assert!(state.visible);
        assert_eq!(state.message, "B");
        assert_eq!(state.kind, ToastKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn first_auto_hide_never_cuts_the_second_message_short() {
        let toasts = controller();
        toasts.enqueue("A", ToastKind::Info);
        sleep(Duration::from_millis(2_500)).await;
        toasts.enqueue("B", ToastKind::Info);

        // A's auto-hide would have fired at 3s
        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(toasts.phase(), ToastPhase::Showing);
        assert_eq!(toasts.state().message, "B");

        // B shown at 2.8s, hides 3s later
        sleep(Duration::from_millis(2_400)).await;
        assert_eq!(toasts.phase(), ToastPhase::Hiding);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_enqueues_end_on_the_latest_message() {
        let toasts = controller();
        let mut rx = toasts.subscribe();
        toasts.enqueue("A", ToastKind::Info);
        toasts.enqueue("B", ToastKind::Info);
        toasts.enqueue("C", ToastKind::Success);

        sleep(Duration::from_millis(310)).await;
        assert_eq!(toasts.state().message, "C");
        assert!(toasts.state().visible);
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow_and_update().message, "C");
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_cancels_auto_hide() {
        let toasts = controller();
        toasts.enqueue("A", ToastKind::Info);
        sleep(Duration::from_millis(500)).await;
        toasts.dismiss();
        assert_eq!(toasts.phase(), ToastPhase::Hiding);

        sleep(Duration::from_millis(310)).await;
        assert_eq!(toasts.phase(), ToastPhase::Idle);

        let mut rx = toasts.subscribe();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(toasts.phase(), ToastPhase::Idle);
        assert!(!rx.has_changed().unwrap_or(true));
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_while_idle_is_a_no_op() {
        let toasts = controller();
        toasts.dismiss();
        assert_eq!(toasts.phase(), ToastPhase::Idle);
        assert!(!toasts.state().animating);
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_during_hide_animation_reveals_new_message() {
        let toasts = controller();
        toasts.enqueue("A", ToastKind::Info);
        toasts.dismiss();
        toasts.enqueue("B", ToastKind::Info);
        assert_eq!(toasts.phase(), ToastPhase::HidingForNext);

        sleep(Duration::from_millis(310)).await;
        assert_eq!(toasts.phase(), ToastPhase::Showing);
        assert_eq!(toasts.state().message, "B");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_silences_pending_timers() {
        let toasts = controller();
        toasts.enqueue("A", ToastKind::Info);
        toasts.shutdown();
        assert_eq!(toasts.phase(), ToastPhase::Idle);

        toasts.enqueue("B", ToastKind::Info);
        sleep(Duration::from_secs(4)).await;
        assert_eq!(toasts.phase(), ToastPhase::Idle);
        assert!(toasts.state().message.is_empty());
    }
}
