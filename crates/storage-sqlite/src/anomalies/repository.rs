use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::upsert::excluded;
use diesel::SqliteConnection;

use adpulse_core::anomalies::{Anomaly, AnomalyRepositoryTrait};
use adpulse_core::Result;

use super::model::AnomalyDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::anomalies;
use crate::utils::ts_to_db;

pub struct AnomalyRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl AnomalyRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl AnomalyRepositoryTrait for AnomalyRepository {
    fn find_latest_by_fingerprint(
        &self,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Anomaly>> {
        let mut conn = get_connection(&self.pool)?;
        let row = anomalies::table
            .filter(anomalies::fingerprint.eq(fingerprint))
            .filter(anomalies::ts.ge(ts_to_db(&since)))
            .order(anomalies::ts.desc())
            .select(AnomalyDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(Anomaly::try_from).transpose()
    }

    async fn upsert_anomaly(&self, anomaly: Anomaly) -> Result<Anomaly> {
        let row = AnomalyDB::from(&anomaly);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Anomaly> {
                diesel::insert_into(anomalies::table)
                    .values(&row)
                    .on_conflict((anomalies::fingerprint, anomalies::ts))
                    .do_update()
                    .set((
                        anomalies::bucket_start.eq(excluded(anomalies::bucket_start)),
                        anomalies::value.eq(excluded(anomalies::value)),
                        anomalies::baseline_median.eq(excluded(anomalies::baseline_median)),
                        anomalies::baseline_mad.eq(excluded(anomalies::baseline_mad)),
                        anomalies::score.eq(excluded(anomalies::score)),
                        anomalies::direction.eq(excluded(anomalies::direction)),
                        anomalies::severity.eq(excluded(anomalies::severity)),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let stored = anomalies::table
                    .filter(anomalies::fingerprint.eq(&row.fingerprint))
                    .filter(anomalies::ts.eq(&row.ts))
                    .select(AnomalyDB::as_select())
                    .first(conn)
                    .map_err(StorageError::from)?;
                Anomaly::try_from(stored)
            })
            .await
    }

    fn list_anomalies(&self, profile_id: &str, limit: i64) -> Result<Vec<Anomaly>> {
        let mut conn = get_connection(&self.pool)?;
        anomalies::table
            .filter(anomalies::profile_id.eq(profile_id))
            .order((anomalies::ts.desc(), anomalies::created_at.desc()))
            .limit(limit.max(0))
            .select(AnomalyDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Anomaly::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_test_db;
    use adpulse_core::anomalies::{AnomalyState, Direction, Severity};
    use adpulse_core::metrics::{Metric, Scope, TimeWindow};
    use chrono::{Duration, TimeZone};

    fn anomaly(id: &str, ts: DateTime<Utc>, score: f64, severity: Severity) -> Anomaly {
        Anomaly {
            id: id.to_string(),
            profile_id: "p1".to_string(),
            scope: Scope::Campaign,
            entity_id: "C1".to_string(),
            metric: Metric::Acos,
            time_window: TimeWindow::Daily,
            ts,
            bucket_start: Utc.with_ymd_and_hms(2026, 8, 3, 0, 0, 0).unwrap(),
            value: 0.9,
            baseline_median: 0.3,
            baseline_mad: 0.05,
            score,
            direction: Direction::Spike,
            severity,
            fingerprint: "fp-1".to_string(),
            state: AnomalyState::New,
            created_at: ts,
        }
    }

    #[tokio::test]
    async fn upsert_on_same_instant_keeps_identity_and_state() {
        let (pool, writer) = setup_test_db();
        let repo = AnomalyRepository::new(pool.clone(), writer);
        let ts = Utc.with_ymd_and_hms(2026, 8, 3, 12, 0, 0).unwrap();

        let first = repo
            .upsert_anomaly(anomaly("a1", ts, 2.5, Severity::Warn))
            .await
            .unwrap();
        assert_eq!(first.id, "a1");

        {
            let mut conn = get_connection(&pool).unwrap();
            diesel::update(anomalies::table.find("a1"))
                .set(anomalies::state.eq("ack"))
                .execute(&mut conn)
                .unwrap();
        }

        let replay = repo
            .upsert_anomaly(anomaly("a2", ts, 4.0, Severity::Critical))
            .await
            .unwrap();
        assert_eq!(replay.id, "a1");
        assert_eq!(replay.state, AnomalyState::Ack);
        assert_eq!(replay.severity, Severity::Critical);
        assert_eq!(replay.score, 4.0);
        assert_eq!(repo.list_anomalies("p1", 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn latest_by_fingerprint_respects_lower_bound() {
        let (pool, writer) = setup_test_db();
        let repo = AnomalyRepository::new(pool, writer);
        let t0 = Utc.with_ymd_and_hms(2026, 8, 3, 6, 0, 0).unwrap();

        repo.upsert_anomaly(anomaly("a1", t0, 2.5, Severity::Warn))
            .await
            .unwrap();
        repo.upsert_anomaly(anomaly("a2", t0 + Duration::hours(2), 3.0, Severity::Warn))
            .await
            .unwrap();

        let latest = repo
            .find_latest_by_fingerprint("fp-1", t0 - Duration::hours(1))
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, "a2");
        assert!(repo
            .find_latest_by_fingerprint("fp-1", t0 + Duration::hours(3))
            .unwrap()
            .is_none());
        assert!(repo
            .find_latest_by_fingerprint("other", t0)
            .unwrap()
            .is_none());

        let listed: Vec<String> = repo
            .list_anomalies("p1", 1)
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(listed, vec!["a2"]);
    }
}
