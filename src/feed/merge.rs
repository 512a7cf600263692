use std::collections::HashSet;

use super::adapters::is_synthesized_id;
use super::model::Notification;

/// Construit une nouvelle feed : maintenance, puis planning, puis exemples, en
/// gardant la première occurrence de chaque id, du plus récent au plus ancien.
///
/// Le tri est stable : à date égale, l'ordre de concaténation est conservé.
#[must_use]
pub fn merge(
    maintenance: Vec<Notification>,
    schedule: Vec<Notification>,
    seeds: Vec<Notification>,
) -> Vec<Notification> {
    let mut seen = HashSet::new();
    let mut feed: Vec<Notification> = maintenance
        .into_iter()
        .chain(schedule)
        .chain(seeds)
        .filter(|n| seen.insert(n.id.clone()))
        .collect();
    feed.sort_by(|a, b| b.date.cmp(&a.date));
    feed
}

/// Marque comme lus les éléments déjà lus dans la feed précédente.
///
/// Retourne le nombre d'éléments concernés.
pub fn carry_read_state(feed: &mut [Notification], previous: &[Notification]) -> usize {
    let read: HashSet<&str> = previous
        .iter()
        .filter(|n| n.read)
        .map(|n| n.id.as_str())
        .collect();
    if read.is_empty() {
        return 0;
    }
    let mut carried = 0;
    for item in feed.iter_mut().filter(|n| !n.read) {
        if read.contains(item.id.as_str()) {
            item.read = true;
            carried += 1;
        }
    }
    carried
}

/// Redonne aux éléments sans clé l'id qu'ils avaient dans la feed précédente.
///
/// Un id synthétisé de `feed` reprend le premier id synthétisé libre de
/// `previous` ayant même type, titre, message et statut. Retourne le nombre
/// d'ids repris.
pub fn reuse_synthesized_ids(feed: &mut [Notification], previous: &[Notification]) -> usize {
    let current: HashSet<&str> = feed.iter().map(|n| n.id.as_str()).collect();
    let mut spare: Vec<&Notification> = previous
        .iter()
        .filter(|n| is_synthesized_id(&n.id) && !current.contains(n.id.as_str()))
        .collect();
    if spare.is_empty() {
        return 0;
    }

    let mut reused = 0;
    for item in feed.iter_mut().filter(|n| is_synthesized_id(&n.id)) {
        let Some(pos) = spare.iter().position(|old| {
            old.kind == item.kind
                && old.title == item.title
                && old.message == item.message
                && old.status == item.status
        }) else {
            continue;
        };
        item.id.clone_from(&spare.remove(pos).id);
        reused += 1;
    }
    reused
}

/// Entrées de tombstone pour un élément retiré : son id, plus une empreinte
/// du contenu si l'id est synthétisé (il ne reviendra pas au prochain poll).
#[must_use]
pub fn tombstone_keys(item: &Notification) -> Vec<String> {
    let mut keys = vec![item.id.clone()];
    if is_synthesized_id(&item.id) {
        keys.push(fingerprint(item));
    }
    keys
}

/// Retire les éléments tombstonés et retourne leur nombre.
pub fn drop_dismissed(feed: &mut Vec<Notification>, dismissed: &HashSet<String>) -> usize {
    if dismissed.is_empty() {
        return 0;
    }
    let before = feed.len();
    feed.retain(|n| {
        !dismissed.contains(&n.id)
            && !(is_synthesized_id(&n.id) && dismissed.contains(&fingerprint(n)))
    });
    before - feed.len()
}

fn fingerprint(item: &Notification) -> String {
    format!(
        "~{}|{}|{}|{}",
        item.kind, item.title, item.message, item.status
    )
}

#[cfg(test)]
mod tests {
    use super::{
        carry_read_state, drop_dismissed, merge, reuse_synthesized_ids, tombstone_keys,
    };
    use crate::feed::{Notification, seed_notifications};
    use crate::types::NotificationKind;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::HashSet;

    fn at(minutes: i64) -> DateTime<Utc> {
        let base = match Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).single() {
            Some(date) => date,
            None => panic!("valid date"),
        };
        base + Duration::minutes(minutes)
    }

    fn item(id: &str, kind: NotificationKind, minutes: i64) -> Notification {
        Notification::new(id, kind, id, "", "", at(minutes))
    }

    #[test]
    fn output_is_sorted_newest_first_and_unique() {
        let maintenance = vec![
            item("m1", NotificationKind::Maintenance, 5),
            item("m2", NotificationKind::Maintenance, 50),
        ];
        let schedule = vec![
            item("s1", NotificationKind::Schedule, 20),
            item("m1", NotificationKind::Schedule, 90),
        ];
        let feed = merge(maintenance, schedule, seed_notifications());

        assert!(feed.windows(2).all(|w| w[0].date >= w[1].date));
        let ids: HashSet<_> = feed.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), feed.len());
        assert_eq!(feed.len(), 6);
    }

    #[test]
    fn first_occurrence_wins_on_id_collision() {
        let maintenance = vec![item("dup", NotificationKind::Maintenance, 1)];
        let schedule = vec![item("dup", NotificationKind::Schedule, 99)];
        let seeds = vec![item("dup", NotificationKind::System, 200)];
        let feed = merge(maintenance, schedule, seeds);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, NotificationKind::Maintenance);
    }

    #[test]
    fn equal_dates_keep_concatenation_order() {
        let feed = merge(
            vec![item("m", NotificationKind::Maintenance, 10)],
            vec![item("s", NotificationKind::Schedule, 10)],
            vec![item("x", NotificationKind::System, 10)],
        );
        let ids: Vec<_> = feed.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["m", "s", "x"]);
    }

    #[test]
    fn merging_same_snapshot_is_idempotent() {
        let build = || {
            merge(
                vec![item("m1", NotificationKind::Maintenance, 3)],
                vec![item("s1", NotificationKind::Schedule, 7)],
                seed_notifications(),
            )
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn read_flags_survive_a_remerge() {
        let mut previous = vec![
            item("a", NotificationKind::System, 1),
            item("b", NotificationKind::System, 2),
        ];
        previous[0].read = true;
        let mut feed = vec![
            item("a", NotificationKind::System, 1),
            item("b", NotificationKind::System, 2),
            item("c", NotificationKind::System, 3),
        ];
        assert_eq!(carry_read_state(&mut feed, &previous), 1);
        assert!(feed[0].read);
        assert!(!feed[1].read);
        assert!(!feed[2].read);
    }

    #[test]
    fn keyless_items_keep_their_previous_id() {
        let previous = vec![
            item("maintenance-1714521600000-0a1b2c3d4", NotificationKind::Maintenance, 1),
            item("s1", NotificationKind::Schedule, 2),
        ];
        let mut feed = vec![
            item("s1", NotificationKind::Schedule, 2),
            item("maintenance-1714521660000-fe98dc76b", NotificationKind::Maintenance, 1),
        ];
        // titles differ because the helper uses the id as title
        feed[1].title.clone_from(&previous[0].title);

        assert_eq!(reuse_synthesized_ids(&mut feed, &previous), 1);
        assert_eq!(feed[1].id, "maintenance-1714521600000-0a1b2c3d4");
        assert_eq!(feed[0].id, "s1");
    }

    #[test]
    fn changed_keyless_items_get_no_reused_id() {
        let previous = vec![item(
            "schedule-1714521600000-0a1b2c3d4",
            NotificationKind::Schedule,
            1,
        )];
        let mut feed = vec![item(
            "schedule-1714521660000-fe98dc76b",
            NotificationKind::Schedule,
            1,
        )];
        assert_eq!(reuse_synthesized_ids(&mut feed, &previous), 0);
        assert_eq!(feed[0].id, "schedule-1714521660000-fe98dc76b");
    }

    #[test]
    fn keyless_tombstones_match_by_content() {
        let dismissed_item = item(
            "maintenance-1714521600000-0a1b2c3d4",
            NotificationKind::Maintenance,
            1,
        );
        let dismissed: HashSet<String> = tombstone_keys(&dismissed_item).into_iter().collect();
        assert_eq!(dismissed.len(), 2);

        let mut reissued = item(
            "maintenance-1714521660000-fe98dc76b",
            NotificationKind::Maintenance,
            1,
        );
        reissued.title.clone_from(&dismissed_item.title);
        let mut feed = vec![reissued, item("m2", NotificationKind::Maintenance, 2)];

        assert_eq!(drop_dismissed(&mut feed, &dismissed), 1);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, "m2");
        assert_eq!(tombstone_keys(&feed[0]), ["m2"]);
    }
}
