use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use adpulse_core::alerts::{Alert, NotificationChannel, QueuedNotification};
use adpulse_core::Result;

use crate::utils::{ts_from_db, ts_to_db};

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::alerts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AlertDB {
    pub id: String,
    pub rule_id: Option<String>,
    pub profile_id: String,
    pub user_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub title: String,
    pub message: String,
    pub level: String,
    pub state: String,
    pub data: String,
    pub created_at: String,
}

impl AlertDB {
    pub fn from_domain(alert: &Alert) -> Result<Self> {
        Ok(Self {
            id: alert.id.clone(),
            rule_id: alert.rule_id.clone(),
            profile_id: alert.profile_id.clone(),
            user_id: alert.user_id.clone(),
            entity_type: alert.entity_type.clone(),
            entity_id: alert.entity_id.clone(),
            title: alert.title.clone(),
            message: alert.message.clone(),
            level: alert.level.as_str().to_string(),
            state: alert.state.as_str().to_string(),
            data: serde_json::to_string(&alert.data)?,
            created_at: ts_to_db(&alert.created_at),
        })
    }
}

impl TryFrom<AlertDB> for Alert {
    type Error = adpulse_core::Error;

    fn try_from(db: AlertDB) -> Result<Self> {
        Ok(Alert {
            level: db.level.parse()?,
            state: db.state.parse()?,
            data: serde_json::from_str(&db.data)?,
            created_at: ts_from_db(&db.created_at)?,
            id: db.id,
            rule_id: db.rule_id,
            profile_id: db.profile_id,
            user_id: db.user_id,
            entity_type: db.entity_type,
            entity_id: db.entity_id,
            title: db.title,
            message: db.message,
        })
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::notification_channels)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NotificationChannelDB {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub target: String,
    pub enabled: bool,
    pub created_at: String,
}

impl TryFrom<NotificationChannelDB> for NotificationChannel {
    type Error = adpulse_core::Error;

    fn try_from(db: NotificationChannelDB) -> Result<Self> {
        Ok(NotificationChannel {
            kind: db.kind.parse()?,
            id: db.id,
            user_id: db.user_id,
            target: db.target,
            enabled: db.enabled,
        })
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::notification_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NotificationQueueDB {
    pub id: String,
    pub alert_id: String,
    pub channel_id: String,
    pub channel_kind: String,
    pub target: String,
    pub status: String,
    pub payload: String,
    pub attempts: i32,
    pub created_at: String,
    pub sent_at: Option<String>,
}

impl NotificationQueueDB {
    pub fn from_domain(notification: QueuedNotification) -> Result<Self> {
        Ok(Self {
            channel_kind: notification.channel_kind.as_str().to_string(),
            payload: serde_json::to_string(&notification.payload)?,
            created_at: ts_to_db(&notification.created_at),
            id: notification.id,
            alert_id: notification.alert_id,
            channel_id: notification.channel_id,
            target: notification.target,
            status: notification.status,
            attempts: 0,
            sent_at: None,
        })
    }
}

impl TryFrom<NotificationQueueDB> for QueuedNotification {
    type Error = adpulse_core::Error;

    fn try_from(db: NotificationQueueDB) -> Result<Self> {
        Ok(QueuedNotification {
            channel_kind: db.channel_kind.parse()?,
            payload: serde_json::from_str(&db.payload)?,
            created_at: ts_from_db(&db.created_at)?,
            id: db.id,
            alert_id: db.alert_id,
            channel_id: db.channel_id,
            target: db.target,
            status: db.status,
        })
    }
}
