use chrono::{DateTime, TimeZone, Utc};

use super::model::Notification;
use crate::types::NotificationKind;

/// Incrémentée à chaque changement de la liste ; les ids l'incluent pour
/// qu'une nouvelle liste ne heurte pas les tombstones d'une ancienne.
pub const SEED_VERSION: u32 = 1;

const SEEDS: &[(&str, &str, &str, &str, i64)] = &[
    (
        "welcome",
        "Welcome to your dashboard",
        "Maintenance updates and bookings will show up here.",
        "info",
        1_704_103_200,
    ),
    (
        "rent-reminder",
        "Rent reminder",
        "Rent is due on the first of each month.",
        "reminder",
        1_706_781_600,
    ),
    (
        "planned-downtime",
        "Planned system maintenance",
        "The portal may be unavailable for a few minutes during updates.",
        "scheduled",
        1_709_287_200,
    ),
];

/// Notifications d'exemple fusionnées à chaque cycle.
#[must_use]
pub fn seed_notifications() -> Vec<Notification> {
    SEEDS
        .iter()
        .map(|&(slug, title, message, status, epoch)| {
            Notification::new(
                format!("seed-v{SEED_VERSION}-{slug}"),
                NotificationKind::System,
                title,
                message,
                status,
                epoch_to_utc(epoch),
            )
        })
        .collect()
}

fn epoch_to_utc(epoch: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(epoch, 0).single().unwrap_or_default()
}
