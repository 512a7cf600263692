//! Clés lues et écrites par le moteur sur le stockage partagé du dashboard.

pub const FEED: &str = "userNotifications";
pub const MAINTENANCE_REQUESTS: &str = "maintenanceRequests";
pub const SCHEDULED_BOOKINGS: &str = "scheduledBookings";
pub const DISMISSED: &str = "dismissedNotifications";
