//! Normalisation des enregistrements bruts du dashboard en [`Notification`].
//!
//! Les enregistrements sont du JSON peu typé écrit par d'autres parties du
//! dashboard. Les adaptateurs n'échouent jamais : ce qui n'est pas un objet
//! JSON est ignoré, les champs absents prennent les valeurs par défaut.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::model::Notification;
use crate::types::NotificationKind;

const MAINTENANCE_PREFIX: &str = "maintenance";
const SCHEDULE_PREFIX: &str = "schedule";
const RANDOM_SUFFIX_LEN: usize = 9;

/// Convertit les tickets de maintenance (`_id`, `title`, `status`, `createdAt`).
#[must_use]
pub fn maintenance_notifications(records: &[Value], now: DateTime<Utc>) -> Vec<Notification> {
    let mut ids = IdSynth::new(MAINTENANCE_PREFIX, now);
    records
        .iter()
        .filter_map(|record| as_record(record, MAINTENANCE_PREFIX))
        .map(|record| {
            let id = ids.resolve(scalar_field(record, &["_id", "id"]));
            let title = text_field(record, "title").unwrap_or_else(|| "Untitled".to_string());
            let status = text_field(record, "status").unwrap_or_else(|| "pending".to_string());
            let date = date_field(record, "createdAt").unwrap_or(now);
            Notification::new(
                id,
                NotificationKind::Maintenance,
                format!("Maintenance Request: {title}"),
                format!("Status: {status}"),
                status,
                date,
            )
        })
        .collect()
}

/// Convertit les réservations planifiées (`id`, `title`, `description`,
/// `date`, `time`, `status`, `createdAt`).
#[must_use]
pub fn schedule_notifications(records: &[Value], now: DateTime<Utc>) -> Vec<Notification> {
    let mut ids = IdSynth::new(SCHEDULE_PREFIX, now);
    records
        .iter()
        .filter_map(|record| as_record(record, SCHEDULE_PREFIX))
        .map(|record| {
            let id = ids.resolve(scalar_field(record, &["id", "_id"]));
            let title = text_field(record, "title").unwrap_or_else(|| "Appointment".to_string());
            let description = text_field(record, "description").unwrap_or_default();
            let day = date_field(record, "date").unwrap_or(now);
            let time = text_field(record, "time").unwrap_or_else(|| "scheduled time".to_string());
            let status = text_field(record, "status").unwrap_or_else(|| "upcoming".to_string());
            let date = date_field(record, "createdAt").unwrap_or(now);
            Notification::new(
                id,
                NotificationKind::Schedule,
                format!("Scheduled: {title}"),
                format!("{description} on {} at {time}", day.format("%-m/%-d/%Y")),
                status,
                date,
            )
        })
        .collect()
}

/// Indique si `id` a la forme `<source>-<millis>-<aléa>` donnée aux
/// enregistrements sans clé naturelle.
#[must_use]
pub fn is_synthesized_id(id: &str) -> bool {
    let Some((source, rest)) = id.split_once('-') else {
        return false;
    };
    let Some((millis, random)) = rest.split_once('-') else {
        return false;
    };
    matches!(source, MAINTENANCE_PREFIX | SCHEDULE_PREFIX)
        && !millis.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && random.len() == RANDOM_SUFFIX_LEN
        && random.bytes().all(|b| b.is_ascii_hexdigit())
}

fn as_record<'a>(record: &'a Value, source: &'static str) -> Option<&'a Map<String, Value>> {
    let object = record.as_object();
    if object.is_none() {
        debug!(source, "skipping malformed source record");
    }
    object
}

/// Émet des ids `<prefix>-<millis>-<aléa>`, uniques au sein d'un appel.
struct IdSynth {
    prefix: &'static str,
    millis: i64,
    issued: HashSet<String>,
}

impl IdSynth {
    fn new(prefix: &'static str, now: DateTime<Utc>) -> Self {
        Self {
            prefix,
            millis: now.timestamp_millis(),
            issued: HashSet::new(),
        }
    }

    fn resolve(&mut self, natural: Option<String>) -> String {
        if let Some(id) = natural {
            self.issued.insert(id.clone());
            return id;
        }
        loop {
            let random = Uuid::new_v4().simple().to_string();
            let id = format!(
                "{}-{}-{}",
                self.prefix,
                self.millis,
                &random[..RANDOM_SUFFIX_LEN]
            );
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }
}

fn scalar_field(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn text_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    scalar_field(record, &[key])
}

fn date_field(record: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    match record.get(key)? {
        Value::String(raw) => parse_date(raw.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::{is_synthesized_id, maintenance_notifications, schedule_notifications};
    use crate::types::NotificationKind;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        match Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).single() {
            Some(date) => date,
            None => panic!("valid date"),
        }
    }

    #[test]
    fn maintenance_keeps_natural_fields() {
        let records = vec![json!({
            "_id": "665f1c",
            "title": "Broken heater",
            "status": "in-progress",
            "createdAt": "2024-05-01T08:15:00.000Z"
        })];
        let out = maintenance_notifications(&records, now());
        assert_eq!(out.len(), 1);
        let n = &out[0];
        assert_eq!(n.id, "665f1c");
        assert_eq!(n.kind, NotificationKind::Maintenance);
        assert_eq!(n.title, "Maintenance Request: Broken heater");
        assert_eq!(n.message, "Status: in-progress");
        assert_eq!(n.status, "in-progress");
        assert_eq!(n.date.to_rfc3339(), "2024-05-01T08:15:00+00:00");
        assert!(!n.read);
    }

    #[test]
    fn maintenance_applies_defaults_for_missing_fields() {
        let out = maintenance_notifications(&[json!({})], now());
        assert_eq!(out.len(), 1);
        let n = &out[0];
        assert!(n.id.starts_with(&format!("maintenance-{}-", now().timestamp_millis())));
        assert_eq!(n.title, "Maintenance Request: Untitled");
        assert_eq!(n.status, "pending");
        assert_eq!(n.date, now());
    }

    #[test]
    fn synthesized_ids_are_unique_within_one_call() {
        let records = vec![json!({}); 50];
        let out = maintenance_notifications(&records, now());
        let ids: HashSet<_> = out.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let records = vec![json!("garbage"), json!(42), json!(null), json!({"_id": "ok"})];
        let out = maintenance_notifications(&records, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "ok");
    }

    #[test]
    fn unparsable_dates_fall_back_to_now() {
        let records = vec![json!({"_id": "a", "createdAt": "last tuesday"})];
        let out = maintenance_notifications(&records, now());
        assert_eq!(out[0].date, now());
    }

    #[test]
    fn schedule_builds_message_from_booking() {
        let records = vec![json!({
            "id": 17,
            "title": "Unit inspection",
            "description": "Annual check",
            "date": "2024-06-03",
            "time": "10:30",
            "createdAt": "2024-05-09T16:00:00Z"
        })];
        let out = schedule_notifications(&records, now());
        assert_eq!(out.len(), 1);
        let n = &out[0];
        assert_eq!(n.id, "17");
        assert_eq!(n.kind, NotificationKind::Schedule);
        assert_eq!(n.title, "Scheduled: Unit inspection");
        assert_eq!(n.message, "Annual check on 6/3/2024 at 10:30");
        assert_eq!(n.status, "upcoming");
    }

    #[test]
    fn schedule_defaults_match_dashboard_wording() {
        let out = schedule_notifications(&[json!({"id": ""})], now());
        let n = &out[0];
        assert!(n.id.starts_with("schedule-"));
        assert_eq!(n.title, "Scheduled: Appointment");
        assert_eq!(n.message, " on 5/10/2024 at scheduled time");
    }

    #[test]
    fn synthesized_ids_are_recognisable() {
        let out = maintenance_notifications(&[json!({"title": "No key"})], now());
        assert!(is_synthesized_id(&out[0].id));
        let out = schedule_notifications(&[json!({"title": "No key"})], now());
        assert!(is_synthesized_id(&out[0].id));

        assert!(!is_synthesized_id("665f1c"));
        assert!(!is_synthesized_id("seed-v1-welcome"));
        assert!(!is_synthesized_id("maintenance-12-short"));
    }
}
