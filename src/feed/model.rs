use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::NotificationKind;

/// Entrée de la feed fusionnée, au format persisté sous la clé de la feed.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub status: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    pub fn new(
        id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        status: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            message: message.into(),
            status: status.into(),
            date,
            read: false,
        }
    }
}
