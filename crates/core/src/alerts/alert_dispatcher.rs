use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use serde_json::json;
use uuid::Uuid;

use super::{Alert, AlertDispatcherTrait, AlertRepositoryTrait, AlertState, QueuedNotification};
use crate::anomalies::{Anomaly, Direction, Severity};
use crate::errors::Result;
use crate::metrics::TimeWindow;
use crate::profiles::ProfileRepositoryTrait;
use crate::utils::time_utils::to_rfc3339_millis;

pub struct AlertDispatcher {
    profile_repository: Arc<dyn ProfileRepositoryTrait>,
    alert_repository: Arc<dyn AlertRepositoryTrait>,
}

impl AlertDispatcher {
    pub fn new(
        profile_repository: Arc<dyn ProfileRepositoryTrait>,
        alert_repository: Arc<dyn AlertRepositoryTrait>,
    ) -> Self {
        Self {
            profile_repository,
            alert_repository,
        }
    }
}

fn alert_title(anomaly: &Anomaly) -> String {
    let movement = match anomaly.direction {
        Direction::Spike => "spike",
        Direction::Dip => "drop",
    };
    format!(
        "{} {} on {} {}",
        anomaly.metric.as_str().to_uppercase(),
        movement,
        anomaly.scope,
        anomaly.entity_id
    )
}

fn alert_message(anomaly: &Anomaly) -> String {
    let bucket = match anomaly.time_window {
        TimeWindow::Intraday => anomaly.bucket_start.format("%Y-%m-%d %H:00 UTC").to_string(),
        TimeWindow::Daily => anomaly.bucket_start.format("%Y-%m-%d").to_string(),
    };
    format!(
        "{} was {:.2} against a baseline of {:.2} (MAD {:.2}, score {:.2}) for {}. Severity: {}.",
        anomaly.metric, anomaly.value, anomaly.baseline_median, anomaly.baseline_mad,
        anomaly.score, bucket, anomaly.severity
    )
}

#[async_trait]
impl AlertDispatcherTrait for AlertDispatcher {
    async fn dispatch(&self, anomaly: &Anomaly) -> Result<Option<Alert>> {
        if anomaly.severity < Severity::Warn {
            return Ok(None);
        }

        let owner = self
            .profile_repository
            .get_profile(&anomaly.profile_id)?
            .and_then(|p| p.user_id);
        let Some(user_id) = owner else {
            warn!(
                "No owning user for profile {}; anomaly {} persisted without an alert",
                anomaly.profile_id, anomaly.id
            );
            return Ok(None);
        };

        let now = Utc::now();
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            rule_id: None,
            profile_id: anomaly.profile_id.clone(),
            user_id: user_id.clone(),
            entity_type: anomaly.scope.as_str().to_string(),
            entity_id: anomaly.entity_id.clone(),
            title: alert_title(anomaly),
            message: alert_message(anomaly),
            level: anomaly.severity,
            state: AlertState::Open,
            data: json!({
                "anomalyId": anomaly.id,
                "fingerprint": anomaly.fingerprint,
                "metric": anomaly.metric,
                "window": anomaly.time_window,
                "direction": anomaly.direction,
                "value": anomaly.value,
                "baseline": anomaly.baseline_median,
                "score": anomaly.score,
                "bucketStart": to_rfc3339_millis(&anomaly.bucket_start),
            }),
            created_at: now,
        };

        let channels = self.alert_repository.list_enabled_channels(&user_id)?;
        let notifications: Vec<QueuedNotification> = channels
            .into_iter()
            .map(|channel| QueuedNotification {
                id: Uuid::new_v4().to_string(),
                alert_id: alert.id.clone(),
                channel_id: channel.id,
                channel_kind: channel.kind,
                target: channel.target,
                status: "pending".to_string(),
                payload: json!({
                    "title": alert.title,
                    "message": alert.message,
                    "level": alert.level,
                }),
                created_at: now,
            })
            .collect();
        if notifications.is_empty() {
            debug!("User {} has no enabled notification channels", user_id);
        }

        let queued = notifications.len();
        let stored = self
            .alert_repository
            .create_alert(alert, notifications)
            .await?;
        info!(
            "Alert {} created for anomaly {} ({} notification(s) queued)",
            stored.id, anomaly.id, queued
        );
        Ok(Some(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{ChannelKind, NotificationChannel};
    use crate::anomalies::AnomalyState;
    use crate::metrics::{Metric, Scope};
    use crate::profiles::{Profile, Region};
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct Profiles {
        owner: Option<String>,
    }

    impl ProfileRepositoryTrait for Profiles {
        fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>> {
            Ok(Some(Profile {
                profile_id: profile_id.to_string(),
                user_id: self.owner.clone(),
                region: Region::Na,
                account_name: None,
                currency_code: None,
                is_active: true,
            }))
        }

        fn list_active_profiles(&self) -> Result<Vec<Profile>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct Alerts {
        channels: Vec<NotificationChannel>,
        created: Mutex<Vec<(Alert, Vec<QueuedNotification>)>>,
    }

    #[async_trait]
    impl AlertRepositoryTrait for Alerts {
        fn list_enabled_channels(&self, user_id: &str) -> Result<Vec<NotificationChannel>> {
            Ok(self
                .channels
                .iter()
                .filter(|c| c.user_id == user_id && c.enabled)
                .cloned()
                .collect())
        }

        async fn create_alert(
            &self,
            alert: Alert,
            notifications: Vec<QueuedNotification>,
        ) -> Result<Alert> {
            self.created
                .lock()
                .unwrap()
                .push((alert.clone(), notifications));
            Ok(alert)
        }

        fn list_alerts(&self, _profile_id: &str, _limit: i64) -> Result<Vec<Alert>> {
            Ok(self
                .created
                .lock()
                .unwrap()
                .iter()
                .map(|(a, _)| a.clone())
                .collect())
        }
    }

    fn anomaly(severity: Severity) -> Anomaly {
        let ts = Utc.with_ymd_and_hms(2026, 3, 10, 14, 5, 0).unwrap();
        Anomaly {
            id: "a1".into(),
            profile_id: "p1".into(),
            scope: Scope::Campaign,
            entity_id: "C1".into(),
            metric: Metric::Acos,
            time_window: TimeWindow::Intraday,
            ts,
            bucket_start: Utc.with_ymd_and_hms(2026, 3, 10, 13, 0, 0).unwrap(),
            value: 42.0,
            baseline_median: 25.0,
            baseline_mad: 3.0,
            score: 3.82,
            direction: Direction::Spike,
            severity,
            fingerprint: "fp".into(),
            state: AnomalyState::New,
            created_at: ts,
        }
    }

    fn channel(id: &str, kind: ChannelKind, enabled: bool) -> NotificationChannel {
        NotificationChannel {
            id: id.into(),
            user_id: "u1".into(),
            kind,
            target: format!("{}-target", id),
            enabled,
        }
    }

    #[tokio::test]
    async fn queues_one_notification_per_enabled_channel() {
        let alerts = Arc::new(Alerts {
            channels: vec![
                channel("ch1", ChannelKind::Email, true),
                channel("ch2", ChannelKind::Slack, true),
                channel("ch3", ChannelKind::Slack, false),
            ],
            ..Alerts::default()
        });
        let dispatcher = AlertDispatcher::new(
            Arc::new(Profiles {
                owner: Some("u1".into()),
            }),
            alerts.clone(),
        );

        let alert = dispatcher
            .dispatch(&anomaly(Severity::Critical))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(alert.title, "ACOS spike on campaign C1");
        assert!(alert.message.contains("2026-03-10 13:00 UTC"));
        assert_eq!(alert.level, Severity::Critical);
        assert_eq!(alert.data["anomalyId"], "a1");
        let created = alerts.created.lock().unwrap();
        assert_eq!(created[0].1.len(), 2);
        assert!(created[0].1.iter().all(|n| n.alert_id == alert.id));
    }

    #[tokio::test]
    async fn alert_without_channels_queues_nothing() {
        let alerts = Arc::new(Alerts::default());
        let dispatcher = AlertDispatcher::new(
            Arc::new(Profiles {
                owner: Some("u1".into()),
            }),
            alerts.clone(),
        );
        assert!(dispatcher
            .dispatch(&anomaly(Severity::Warn))
            .await
            .unwrap()
            .is_some());
        assert!(alerts.created.lock().unwrap()[0].1.is_empty());
    }

    #[tokio::test]
    async fn missing_owner_is_not_an_error() {
        let alerts = Arc::new(Alerts::default());
        let dispatcher = AlertDispatcher::new(Arc::new(Profiles { owner: None }), alerts.clone());

        assert!(dispatcher
            .dispatch(&anomaly(Severity::Critical))
            .await
            .unwrap()
            .is_none());
        assert!(dispatcher
            .dispatch(&anomaly(Severity::Info))
            .await
            .unwrap()
            .is_none());
        assert!(alerts.created.lock().unwrap().is_empty());
    }
}
