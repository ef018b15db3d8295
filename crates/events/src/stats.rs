//! Delivery statistics for the admin dashboard.

use pulse_db::repositories::{NotificationRepo, UserRepo};
use pulse_db::{DbError, DocumentStore};
use serde::Serialize;

/// Window counted as "recent".
pub const RECENT_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationStats {
    pub total_users: u64,
    pub total_notifications: u64,
    pub unread_notifications: u64,
    /// Notifications created in the last [`RECENT_DAYS`] days.
    pub recent_notifications: u64,
    /// Percentage of notifications read, two decimals.
    pub read_rate: f64,
}

pub async fn collect(store: &dyn DocumentStore) -> Result<NotificationStats, DbError> {
    let total_users = UserRepo::count(store).await?;
    let total_notifications = NotificationRepo::count_all(store).await?;
    let unread_notifications = NotificationRepo::count_unread(store).await?;
    let recent_notifications = NotificationRepo::count_recent(store, RECENT_DAYS).await?;

    Ok(NotificationStats {
        total_users,
        total_notifications,
        unread_notifications,
        recent_notifications,
        read_rate: read_rate(total_notifications, unread_notifications),
    })
}

fn read_rate(total: u64, unread: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let read = total.saturating_sub(unread) as f64;
    (read / total as f64 * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_rate_rounds_to_two_decimals() {
        assert_eq!(read_rate(0, 0), 0.0);
        assert_eq!(read_rate(3, 1), 66.67);
        assert_eq!(read_rate(7, 6), 14.29);
        assert_eq!(read_rate(4, 0), 100.0);
    }
}
