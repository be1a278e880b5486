use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::anomalies::Severity;
use crate::errors::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Open,
    Acknowledged,
    Closed,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Open => "open",
            AlertState::Acknowledged => "acknowledged",
            AlertState::Closed => "closed",
        }
    }
}

impl FromStr for AlertState {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(AlertState::Open),
            "acknowledged" => Ok(AlertState::Acknowledged),
            "closed" => Ok(AlertState::Closed),
            other => Err(Error::validation(format!("Unknown alert state '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    /// Set when an explicit alert rule fired; anomaly alerts have none.
    pub rule_id: Option<String>,
    pub profile_id: String,
    pub user_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub title: String,
    pub message: String,
    pub level: Severity,
    pub state: AlertState,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    Slack,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::Slack => "slack",
        }
    }
}

impl FromStr for ChannelKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "email" => Ok(ChannelKind::Email),
            "slack" => Ok(ChannelKind::Slack),
            other => Err(Error::validation(format!("Unknown channel kind '{}'", other))),
        }
    }
}

/// A user's delivery target, e.g. an address or a webhook URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationChannel {
    pub id: String,
    pub user_id: String,
    pub kind: ChannelKind,
    pub target: String,
    pub enabled: bool,
}

/// Outbound delivery request picked up by the notification service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedNotification {
    pub id: String,
    pub alert_id: String,
    pub channel_id: String,
    pub channel_kind: ChannelKind,
    pub target: String,
    pub status: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}
