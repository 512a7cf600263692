use std::collections::{BTreeSet, HashSet};

use super::model::Notification;

/// Ids présents dans `current` mais absents de `previous`.
///
/// Un `previous` vide signifie qu'il n'y a pas d'instantané : rien n'est
/// signalé comme nouveau.
#[must_use]
pub fn detect_new(previous: &[Notification], current: &[Notification]) -> BTreeSet<String> {
    if previous.is_empty() {
        return BTreeSet::new();
    }
    let known: HashSet<&str> = previous.iter().map(|n| n.id.as_str()).collect();
    current
        .iter()
        .filter(|n| !known.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect()
}

/// Arrivées par rapport à l'instantané persisté.
///
/// `None` est un premier lancement : rien n'est signalé. Une feed persistée
/// vide reste un instantané, donc tous les ids courants sont nouveaux.
#[must_use]
pub fn detect_arrivals(
    previous: Option<&[Notification]>,
    current: &[Notification],
) -> BTreeSet<String> {
    match previous {
        None => BTreeSet::new(),
        Some([]) => current.iter().map(|n| n.id.clone()).collect(),
        Some(previous) => detect_new(previous, current),
    }
}
