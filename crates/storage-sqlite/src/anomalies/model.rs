use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use adpulse_core::anomalies::Anomaly;
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
#[diesel(table_name = crate::schema::anomalies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AnomalyDB {
    pub id: String,
    pub profile_id: String,
    pub scope: String,
    pub entity_id: String,
    pub metric: String,
    pub time_window: String,
    pub ts: String,
    pub bucket_start: String,
    pub value: f64,
    pub baseline_median: f64,
    pub baseline_mad: f64,
    pub score: f64,
    pub direction: String,
    pub severity: String,
    pub fingerprint: String,
    pub state: String,
    pub created_at: String,
}

impl From<&Anomaly> for AnomalyDB {
    fn from(anomaly: &Anomaly) -> Self {
        Self {
            id: anomaly.id.clone(),
            profile_id: anomaly.profile_id.clone(),
            scope: anomaly.scope.as_str().to_string(),
            entity_id: anomaly.entity_id.clone(),
            metric: anomaly.metric.as_str().to_string(),
            time_window: anomaly.time_window.as_str().to_string(),
            ts: ts_to_db(&anomaly.ts),
            bucket_start: ts_to_db(&anomaly.bucket_start),
            value: anomaly.value,
            baseline_median: anomaly.baseline_median,
            baseline_mad: anomaly.baseline_mad,
            score: anomaly.score,
            direction: anomaly.direction.as_str().to_string(),
            severity: anomaly.severity.as_str().to_string(),
            fingerprint: anomaly.fingerprint.clone(),
            state: anomaly.state.as_str().to_string(),
            created_at: ts_to_db(&anomaly.created_at),
        }
    }
}

impl TryFrom<AnomalyDB> for Anomaly {
    type Error = adpulse_core::Error;

    fn try_from(db: AnomalyDB) -> Result<Self> {
        Ok(Anomaly {
            scope: db.scope.parse()?,
            metric: db.metric.parse()?,
            time_window: db.time_window.parse()?,
            ts: ts_from_db(&db.ts)?,
            bucket_start: ts_from_db(&db.bucket_start)?,
            direction: db.direction.parse()?,
            severity: db.severity.parse()?,
            state: db.state.parse()?,
            created_at: ts_from_db(&db.created_at)?,
            id: db.id,
            profile_id: db.profile_id,
            entity_id: db.entity_id,
            value: db.value,
            baseline_median: db.baseline_median,
            baseline_mad: db.baseline_mad,
            score: db.score,
            fingerprint: db.fingerprint,
        })
    }
}
