use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;

use adpulse_core::alerts::{Alert, AlertRepositoryTrait, NotificationChannel, QueuedNotification};
use adpulse_core::Result;

use super::model::{AlertDB, NotificationChannelDB, NotificationQueueDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{alerts, notification_channels, notification_queue};
use crate::utils::ts_to_db;

pub struct AlertRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl AlertRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }

    pub async fn add_channel(&self, channel: NotificationChannel) -> Result<()> {
        let row = NotificationChannelDB {
            kind: channel.kind.as_str().to_string(),
            id: channel.id,
            user_id: channel.user_id,
            target: channel.target,
            enabled: channel.enabled,
            created_at: ts_to_db(&Utc::now()),
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(notification_channels::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    /// Pending deliveries for one alert, oldest first.
    pub fn list_queued_notifications(&self, alert_id: &str) -> Result<Vec<QueuedNotification>> {
        let mut conn = get_connection(&self.pool)?;
        notification_queue::table
            .filter(notification_queue::alert_id.eq(alert_id))
            .order((notification_queue::created_at.asc(), notification_queue::id.asc()))
            .select(NotificationQueueDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(QueuedNotification::try_from)
            .collect()
    }
}

#[async_trait]
impl AlertRepositoryTrait for AlertRepository {
    fn list_enabled_channels(&self, user_id: &str) -> Result<Vec<NotificationChannel>> {
        let mut conn = get_connection(&self.pool)?;
        notification_channels::table
            .filter(notification_channels::user_id.eq(user_id))
            .filter(notification_channels::enabled.eq(true))
            .order(notification_channels::created_at.asc())
            .select(NotificationChannelDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(NotificationChannel::try_from)
            .collect()
    }

    async fn create_alert(
        &self,
        alert: Alert,
        notifications: Vec<QueuedNotification>,
    ) -> Result<Alert> {
        let alert_row = AlertDB::from_domain(&alert)?;
        let queue_rows = notifications
            .into_iter()
            .map(NotificationQueueDB::from_domain)
            .collect::<Result<Vec<_>>>()?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Alert> {
                diesel::insert_into(alerts::table)
                    .values(&alert_row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if !queue_rows.is_empty() {
                    diesel::insert_into(notification_queue::table)
                        .values(&queue_rows)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                debug!(
                    "Stored alert {} with {} queued notification(s)",
                    alert_row.id,
                    queue_rows.len()
                );
                let stored = alerts::table
                    .find(&alert_row.id)
                    .select(AlertDB::as_select())
                    .first(conn)
                    .map_err(StorageError::from)?;
                Alert::try_from(stored)
            })
            .await
    }

    fn list_alerts(&self, profile_id: &str, limit: i64) -> Result<Vec<Alert>> {
        let mut conn = get_connection(&self.pool)?;
        alerts::table
            .filter(alerts::profile_id.eq(profile_id))
            .order((alerts::created_at.desc(), alerts::id.desc()))
            .limit(limit.max(0))
            .select(AlertDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Alert::try_from)
            .collect()
    }
}
