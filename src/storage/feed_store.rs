use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::keys;
use super::kv::KeyValueStore;
use crate::error::StoreError;
use crate::feed::{Notification, tombstone_keys};

/// Seul écrivain de la feed persistée.
///
/// Chaque opération relit d'abord la valeur persistée ; rien n'est gardé en
/// cache entre deux appels.
#[derive(Clone)]
pub struct FeedStore {
    kv: Arc<dyn KeyValueStore>,
    tombstone_capacity: NonZeroUsize,
}

impl FeedStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, tombstone_capacity: usize) -> Self {
        Self {
            kv,
            tombstone_capacity: NonZeroUsize::new(tombstone_capacity).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Feed persistée actuelle ; absente ou corrompue, elle se lit comme vide.
    #[must_use]
    pub fn load(&self) -> Vec<Notification> {
        self.snapshot().unwrap_or_default()
    }

    /// Comme [`Self::load`], mais `None` si aucune feed lisible n'a jamais été
    /// persistée. Une feed vide écrite par `clear_all` reste `Some(vec![])`.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<Notification>> {
        self.read_json(keys::FEED)
    }

    /// Remplace la feed persistée.
    ///
    /// # Errors
    ///
    /// Retourne une erreur si la feed ne peut être encodée ou écrite.
    pub fn save(&self, feed: &[Notification]) -> Result<(), StoreError> {
        self.write_json(keys::FEED, &feed)
    }

    /// # Errors
    ///
    /// Retourne une erreur si la feed mise à jour ne peut être écrite.
    pub fn mark_all_read(&self) -> Result<Vec<Notification>, StoreError> {
        let mut feed = self.load();
        for item in &mut feed {
            item.read = true;
        }
        self.save(&feed)?;
        Ok(feed)
    }

    /// Retire un élément et le mémorise pour que les fusions suivantes l'ignorent.
    ///
    /// # Errors
    ///
    /// Retourne une erreur si les tombstones ou la feed ne peuvent être écrits.
    pub fn dismiss(&self, id: &str) -> Result<Vec<Notification>, StoreError> {
        let mut feed = self.load();
        let Some(pos) = feed.iter().position(|n| n.id == id) else {
            debug!(id, "dismiss requested for unknown notification");
            return Ok(feed);
        };
        let removed = feed.remove(pos);
        self.add_tombstones(tombstone_keys(&removed))?;
        self.save(&feed)?;
        Ok(feed)
    }

    /// # Errors
    ///
    /// Retourne une erreur si les tombstones ou la feed vide ne peuvent être écrits.
    pub fn clear_all(&self) -> Result<Vec<Notification>, StoreError> {
        let feed = self.load();
        self.add_tombstones(feed.iter().flat_map(tombstone_keys))?;
        self.save(&[])?;
        Ok(Vec::new())
    }

    /// Entrées retirées par `dismiss` ou `clear_all`, limitées aux plus récentes.
    #[must_use]
    pub fn dismissed(&self) -> HashSet<String> {
        self.read_json::<Vec<String>>(keys::DISMISSED)
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    /// Enregistrements bruts écrits sous `key` par une autre partie du dashboard.
    #[must_use]
    pub fn source_records(&self, key: &str) -> Vec<Value> {
        match self.read_json::<Value>(key) {
            Some(Value::Array(records)) => records,
            Some(other) => {
                warn!(key, kind = value_kind(&other), "source data is not a list; ignoring");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn add_tombstones(&self, ids: impl IntoIterator<Item = String>) -> Result<(), StoreError> {
        let mut cache: LruCache<String, ()> = LruCache::new(self.tombstone_capacity);
        let stored: Vec<String> = self.read_json(keys::DISMISSED).unwrap_or_default();
        // stored newest first; replay oldest first so recency is preserved
        for id in stored.into_iter().rev() {
            cache.put(id, ());
        }
        let mut added = 0usize;
        for id in ids {
            cache.put(id, ());
            added += 1;
        }
        if added == 0 {
            return Ok(());
        }
        let ordered: Vec<&String> = cache.iter().map(|(id, _)| id).collect();
        self.write_json(keys::DISMISSED, &ordered)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, error = %err, "failed to read persisted value; using empty fallback");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "persisted value is not valid JSON; using empty fallback");
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.kv.set(key, &encoded)
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
