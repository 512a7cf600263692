use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::audio::AudioCue;
use crate::error::{AudioError, StoreError};
use crate::feed::{
    Notification, carry_read_state, detect_arrivals, drop_dismissed, maintenance_notifications,
    merge, reuse_synthesized_ids, schedule_notifications, seed_notifications,
};
use crate::storage::{FeedStore, keys};
use crate::toast::{ToastController, ToastState};
use crate::types::{KindFilter, NotificationKind, ToastKind};

const WRITE_FAILURE_MESSAGE: &str = "Notifications could not be saved";

/// Résultat d'un cycle de fusion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CycleReport {
    pub total: usize,
    pub new_ids: BTreeSet<String>,
    pub carried_read: usize,
    pub suppressed: usize,
    pub persisted: bool,
}

/// État des notifications d'une vue montée.
///
/// Tous les collaborateurs sont injectés ; aucun état global de module.
pub struct NotificationCenter {
    store: FeedStore,
    toasts: ToastController,
    audio: Arc<dyn AudioCue>,
    filter: KindFilter,
    new_arrival: bool,
    write_failure_reported: bool,
}

impl NotificationCenter {
    pub fn new(store: FeedStore, toasts: ToastController, audio: Arc<dyn AudioCue>) -> Self {
        Self {
            store,
            toasts,
            audio,
            filter: KindFilter::All,
            new_arrival: false,
            write_failure_reported: false,
        }
    }

    /// Collecte les sources, fusionne, persiste et compare à la feed persistée
    /// avant l'appel.
    pub fn refresh(&mut self) -> CycleReport {
        let now = Utc::now();
        let snapshot = self.store.snapshot();
        let previous = snapshot.as_deref().unwrap_or_default();

        let maintenance = maintenance_notifications(
            &self.store.source_records(keys::MAINTENANCE_REQUESTS),
            now,
        );
        let schedule =
            schedule_notifications(&self.store.source_records(keys::SCHEDULED_BOOKINGS), now);
        let mut feed = merge(maintenance, schedule, seed_notifications());
        let reused_ids = reuse_synthesized_ids(&mut feed, previous);

        let suppressed = drop_dismissed(&mut feed, &self.store.dismissed());
        let carried_read = carry_read_state(&mut feed, previous);

        let persisted = match self.store.save(&feed) {
            Ok(()) => {
                self.write_failure_reported = false;
                true
            }
            Err(err) => {
                self.report_write_failure(&err);
                false
            }
        };

        let new_ids = detect_arrivals(snapshot.as_deref(), &feed);
        if !new_ids.is_empty() {
            if persisted {
                self.announce(new_ids.len());
            } else {
                // not saved, so the next cycle reports them again
                debug!(count = new_ids.len(), "arrivals held back until the feed is saved");
            }
        }

        debug!(
            total = feed.len(),
            new = new_ids.len(),
            carried_read,
            reused_ids,
            suppressed,
            persisted,
            "merge cycle complete"
        );
        CycleReport {
            total: feed.len(),
            new_ids,
            carried_read,
            suppressed,
            persisted,
        }
    }

    /// # Errors
    ///
    /// Retourne une erreur si la feed mise à jour ne peut être persistée ; un
    /// toast d'erreur est aussi affiché.
    pub fn mark_all_read(&mut self) -> Result<()> {
        let result = self.store.mark_all_read().map(|_| ());
        self.finish_mutation(result, "All notifications marked as read")
    }

    /// # Errors
    ///
    /// Retourne une erreur si la feed mise à jour ne peut être persistée ; un
    /// toast d'erreur est aussi affiché.
    pub fn dismiss(&mut self, id: &str) -> Result<()> {
        let result = self.store.dismiss(id).map(|_| ());
        self.finish_mutation(result, "Notification dismissed")
    }

    /// # Errors
    ///
    /// Retourne une erreur si la feed vide ne peut être persistée ; un toast
    /// d'erreur est aussi affiché.
    pub fn clear_all(&mut self) -> Result<()> {
        let result = self.store.clear_all().map(|_| ());
        self.finish_mutation(result, "All notifications cleared")
    }

    pub fn set_filter(&mut self, filter: KindFilter) {
        self.filter = filter;
    }

    #[must_use]
    pub const fn filter(&self) -> KindFilter {
        self.filter
    }

    /// Feed persistée, restreinte au filtre actif.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        let filter = self.filter;
        let mut feed = self.store.load();
        feed.retain(|n| filter.matches(n.kind));
        feed
    }

    /// Non-lus sur toute la feed, quel que soit le filtre.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.store.load().iter().filter(|n| !n.read).count()
    }

    #[must_use]
    pub fn unread_count_by_kind(&self, kind: NotificationKind) -> usize {
        self.store
            .load()
            .iter()
            .filter(|n| n.kind == kind && !n.read)
            .count()
    }

    #[must_use]
    pub const fn has_new_arrivals(&self) -> bool {
        self.new_arrival
    }

    pub fn acknowledge_new_arrivals(&mut self) {
        self.new_arrival = false;
    }

    #[must_use]
    pub fn toast_state(&self) -> ToastState {
        self.toasts.state()
    }

    #[must_use]
    pub const fn toasts(&self) -> &ToastController {
        &self.toasts
    }

    fn finish_mutation(
        &mut self,
        result: std::result::Result<(), StoreError>,
        confirmation: &str,
    ) -> Result<()> {
        match result {
            Ok(()) => {
                self.write_failure_reported = false;
                self.toasts.enqueue(confirmation, ToastKind::Info);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "notification update failed");
                self.toasts.enqueue(WRITE_FAILURE_MESSAGE, ToastKind::Error);
                Err(err.into())
            }
        }
    }

    fn report_write_failure(&mut self, err: &StoreError) {
        error!(error = %err, "failed to persist merged feed");
        if self.write_failure_reported {
            return;
        }
        self.write_failure_reported = true;
        self.toasts.enqueue(WRITE_FAILURE_MESSAGE, ToastKind::Error);
    }

    fn announce(&mut self, count: usize) {
        self.new_arrival = true;
        let plural = if count == 1 { "" } else { "s" };
        info!(count, "new notifications arrived");
        self.toasts
            .enqueue(format!("{count} new notification{plural}"), ToastKind::Info);
        match self.audio.play() {
            Ok(()) => {}
            Err(AudioError::Unavailable) => debug!("no audio output for notification cue"),
            Err(err) => warn!(error = %err, "notification sound failed"),
        }
    }
}
