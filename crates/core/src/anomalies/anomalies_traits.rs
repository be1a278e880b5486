use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Anomaly, DetectionSummary};
use crate::errors::Result;
use crate::metrics::{Scope, TimeWindow};

#[async_trait]
pub trait AnomalyRepositoryTrait: Send + Sync {
    /// Most recent anomaly with `fingerprint` whose `ts` is at or after `since`.
    fn find_latest_by_fingerprint(
        &self,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Anomaly>>;

    /// Inserts or overwrites the row keyed on `(fingerprint, ts)` and returns
    /// the stored row. An existing row keeps its id and state.
    async fn upsert_anomaly(&self, anomaly: Anomaly) -> Result<Anomaly>;

    fn list_anomalies(&self, profile_id: &str, limit: i64) -> Result<Vec<Anomaly>>;
}

#[async_trait]
pub trait AnomalyServiceTrait: Send + Sync {
    /// Evaluates every metric for one profile, or all active profiles when
    /// `profile_id` is `None`.
    async fn detect(
        &self,
        profile_id: Option<&str>,
        scope: Scope,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Result<DetectionSummary>;

    fn list_anomalies(&self, profile_id: &str, limit: i64) -> Result<Vec<Anomaly>>;
}
