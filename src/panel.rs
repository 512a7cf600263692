use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::info;

use crate::Result;
use crate::audio::AudioCue;
use crate::center::NotificationCenter;
use crate::config::Config;
use crate::feed::Notification;
use crate::poller::Poller;
use crate::storage::{FeedStore, KeyValueStore};
use crate::toast::{ToastController, ToastState};
use crate::types::{KindFilter, NotificationKind};

/// Vue de notifications montée.
///
/// Le montage construit le [`NotificationCenter`] et lance le polling ; toutes
/// les opérations, issues du poll ou de l'utilisateur, passent par le même
/// verrou et sont donc totalement ordonnées. Le démontage arrête le poller et
/// coupe les timers de toast.
pub struct NotificationPanel {
    center: Arc<Mutex<NotificationCenter>>,
    toasts: ToastController,
    poller: Option<Poller>,
}

impl NotificationPanel {
    /// Doit être appelé depuis un runtime tokio.
    pub fn mount(config: &Config, kv: Arc<dyn KeyValueStore>, audio: Arc<dyn AudioCue>) -> Self {
        let toasts = ToastController::new(config.toast);
        let store = FeedStore::new(kv, config.storage.dismissed_capacity);
        let center = Arc::new(Mutex::new(NotificationCenter::new(
            store,
            toasts.clone(),
            audio,
        )));

        let cycle_center = Arc::clone(&center);
        let poller = Poller::start(config.poll_interval, move || {
            let center = Arc::clone(&cycle_center);
            async move {
                let report = center.lock().await.refresh();
                if !report.new_ids.is_empty() {
                    info!(new = ?report.new_ids, "new notifications detected");
                }
            }
        });

        info!("notification panel mounted");
        Self {
            center,
            toasts,
            poller: Some(poller),
        }
    }

    /// Demande un cycle immédiat au poller.
    pub fn refresh_now(&self) -> bool {
        self.poller.as_ref().is_some_and(Poller::trigger)
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.center.lock().await.notifications()
    }

    pub async fn unread_count(&self) -> usize {
        self.center.lock().await.unread_count()
    }

    pub async fn unread_count_by_kind(&self, kind: NotificationKind) -> usize {
        self.center.lock().await.unread_count_by_kind(kind)
    }

    pub async fn has_new_arrivals(&self) -> bool {
        self.center.lock().await.has_new_arrivals()
    }

    pub async fn acknowledge_new_arrivals(&self) {
        self.center.lock().await.acknowledge_new_arrivals();
    }

    pub async fn set_filter(&self, filter: KindFilter) {
        self.center.lock().await.set_filter(filter);
    }

    /// # Errors
    ///
    /// Retourne une erreur si la feed ne peut être persistée.
    pub async fn mark_all_read(&self) -> Result<()> {
        self.center.lock().await.mark_all_read()
    }

    /// # Errors
    ///
    /// Retourne une erreur si la feed ne peut être persistée.
    pub async fn dismiss(&self, id: &str) -> Result<()> {
        self.center.lock().await.dismiss(id)
    }

    /// # Errors
    ///
    /// Retourne une erreur si la feed ne peut être persistée.
    pub async fn clear_all(&self) -> Result<()> {
        self.center.lock().await.clear_all()
    }

    #[must_use]
    pub fn toast_state(&self) -> ToastState {
        self.toasts.state()
    }

    #[must_use]
    pub fn subscribe_toasts(&self) -> watch::Receiver<ToastState> {
        self.toasts.subscribe()
    }

    pub fn dismiss_toast(&self) {
        self.toasts.dismiss();
    }

    pub async fn unmount(mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        self.toasts.shutdown();
        info!("notification panel unmounted");
    }
}
