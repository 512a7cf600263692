pub mod adapters;
pub mod diff;
pub mod merge;
pub mod model;
pub mod seed;

pub use adapters::{is_synthesized_id, maintenance_notifications, schedule_notifications};
pub use diff::{detect_arrivals, detect_new};
pub use merge::{
    carry_read_state, drop_dismissed, merge, reuse_synthesized_ids, tombstone_keys,
};
pub use model::Notification;
pub use seed::seed_notifications;
