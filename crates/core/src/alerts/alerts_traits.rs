use async_trait::async_trait;

use super::{Alert, NotificationChannel, QueuedNotification};
use crate::anomalies::Anomaly;
use crate::errors::Result;

#[async_trait]
pub trait AlertRepositoryTrait: Send + Sync {
    fn list_enabled_channels(&self, user_id: &str) -> Result<Vec<NotificationChannel>>;

    /// Stores the alert and its queued notifications in one transaction.
    async fn create_alert(
        &self,
        alert: Alert,
        notifications: Vec<QueuedNotification>,
    ) -> Result<Alert>;

    fn list_alerts(&self, profile_id: &str, limit: i64) -> Result<Vec<Alert>>;
}

/// Turns a persisted anomaly into an alert.
#[async_trait]
pub trait AlertDispatcherTrait: Send + Sync {
    /// Returns `Ok(None)` when no alert is due, e.g. the profile has no owner.
    async fn dispatch(&self, anomaly: &Anomaly) -> Result<Option<Alert>>;
}
