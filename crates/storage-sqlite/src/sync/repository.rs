use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use uuid::Uuid;

use adpulse_core::catalog::EntityType;
use adpulse_core::errors::Error;
use adpulse_core::sync::{
    SyncMode, SyncRun, SyncRunCompletion, SyncRunStatus, SyncState, SyncStateRepositoryTrait,
};
use adpulse_core::Result;

use super::model::{SyncRunDB, SyncStateDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{sync_runs, sync_state};
use crate::utils::{enum_to_db, opt_ts_from_db, ts_to_db};

pub struct SyncStateRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SyncStateRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

fn load_run(conn: &mut SqliteConnection, run_id: &str) -> Result<SyncRun> {
    let row = sync_runs::table
        .find(run_id)
        .select(SyncRunDB::as_select())
        .first(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or_else(|| Error::not_found(format!("Sync run '{}' not found", run_id)))?;
    SyncRun::try_from(row)
}

#[async_trait]
impl SyncStateRepositoryTrait for SyncStateRepository {
    fn get_state(&self, profile_id: &str, entity_type: EntityType) -> Result<Option<SyncState>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_state::table
            .find((profile_id, enum_to_db(&entity_type)?))
            .select(SyncStateDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(SyncState::try_from).transpose()
    }

    fn list_states(&self, profile_id: &str) -> Result<Vec<SyncState>> {
        let mut conn = get_connection(&self.pool)?;
        let mut states = sync_state::table
            .filter(sync_state::profile_id.eq(profile_id))
            .select(SyncStateDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(SyncState::try_from)
            .collect::<Result<Vec<_>>>()?;
        states.sort_by_key(|state| state.entity_type);
        Ok(states)
    }

    fn list_recent_runs(&self, profile_id: &str, limit: i64) -> Result<Vec<SyncRun>> {
        let mut conn = get_connection(&self.pool)?;
        sync_runs::table
            .filter(sync_runs::profile_id.eq(profile_id))
            .order((sync_runs::started_at.desc(), sync_runs::id.desc()))
            .limit(limit.max(0))
            .select(SyncRunDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(SyncRun::try_from)
            .collect()
    }

    async fn start_run(
        &self,
        profile_id: &str,
        entity_type: EntityType,
        mode: SyncMode,
        started_at: DateTime<Utc>,
    ) -> Result<SyncRun> {
        let row = SyncRunDB {
            id: Uuid::now_v7().to_string(),
            profile_id: profile_id.to_string(),
            entity_type: enum_to_db(&entity_type)?,
            mode: mode.as_str().to_string(),
            status: SyncRunStatus::Running.as_str().to_string(),
            items_upserted: 0,
            pages_fetched: 0,
            warnings: "[]".to_string(),
            started_at: ts_to_db(&started_at),
            finished_at: None,
            error: None,
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<SyncRun> {
                diesel::insert_into(sync_runs::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                load_run(conn, &row.id)
            })
            .await
    }

    async fn finish_run(&self, run_id: &str, completion: SyncRunCompletion) -> Result<SyncRun> {
        let run_id = run_id.to_string();
        let warnings_json = serde_json::to_string(&completion.warnings)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<SyncRun> {
                let current = load_run(conn, &run_id)?;
                if current.status != SyncRunStatus::Running {
                    return Err(Error::validation(format!(
                        "Sync run '{}' already finished with status {}",
                        run_id,
                        current.status.as_str()
                    )));
                }
                let finished_at = completion.finished_at.max(current.started_at);
                diesel::update(sync_runs::table.find(&run_id))
                    .set((
                        sync_runs::status.eq(completion.status.as_str()),
                        sync_runs::items_upserted.eq(completion.items_upserted),
                        sync_runs::pages_fetched.eq(completion.pages_fetched),
                        sync_runs::warnings.eq(warnings_json),
                        sync_runs::finished_at.eq(Some(ts_to_db(&finished_at))),
                        sync_runs::error.eq(completion.error),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                load_run(conn, &run_id)
            })
            .await
    }

    async fn advance_state(
        &self,
        profile_id: &str,
        entity_type: EntityType,
        mode: SyncMode,
        candidate_watermark: Option<DateTime<Utc>>,
        synced_at: DateTime<Utc>,
    ) -> Result<SyncState> {
        let profile_key = profile_id.to_string();
        let entity_key = enum_to_db(&entity_type)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<SyncState> {
                let existing = sync_state::table
                    .find((&profile_key, &entity_key))
                    .select(SyncStateDB::as_select())
                    .first(conn)
                    .optional()
                    .map_err(StorageError::from)?;

                let mut row = existing.unwrap_or_else(|| SyncStateDB {
                    profile_id: profile_key.clone(),
                    entity_type: entity_key.clone(),
                    high_watermark: None,
                    last_full_sync_at: None,
                    last_incremental_sync_at: None,
                });

                let stored = opt_ts_from_db(row.high_watermark.as_deref())?;
                let watermark = match (stored, candidate_watermark) {
                    (Some(current), Some(candidate)) => Some(current.max(candidate)),
                    (current, candidate) => current.or(candidate),
                };
                row.high_watermark = watermark.as_ref().map(ts_to_db);
                let synced = Some(ts_to_db(&synced_at));
                match mode {
                    SyncMode::Full => row.last_full_sync_at = synced,
                    SyncMode::Incremental => row.last_incremental_sync_at = synced,
                }

                diesel::insert_into(sync_state::table)
                    .values(&row)
                    .on_conflict((sync_state::profile_id, sync_state::entity_type))
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                SyncState::try_from(row)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_test_db;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn watermark_never_moves_backward() {
        let (pool, writer) = setup_test_db();
        let repo = SyncStateRepository::new(pool, writer);

        let state = repo
            .advance_state("p1", EntityType::Campaigns, SyncMode::Full, Some(at(10)), at(11))
            .await
            .unwrap();
        assert_eq!(state.high_watermark, Some(at(10)));
        assert_eq!(state.last_full_sync_at, Some(at(11)));
        assert_eq!(state.last_incremental_sync_at, None);

        let state = repo
            .advance_state("p1", EntityType::Campaigns, SyncMode::Incremental, Some(at(8)), at(12))
            .await
            .unwrap();
        assert_eq!(state.high_watermark, Some(at(10)));
        assert_eq!(state.last_full_sync_at, Some(at(11)));
        assert_eq!(state.last_incremental_sync_at, Some(at(12)));

        let state = repo
            .advance_state("p1", EntityType::Campaigns, SyncMode::Incremental, None, at(13))
            .await
            .unwrap();
        assert_eq!(state.high_watermark, Some(at(10)));

        repo.advance_state("p1", EntityType::Campaigns, SyncMode::Incremental, Some(at(14)), at(15))
            .await
            .unwrap();
        let stored = repo.get_state("p1", EntityType::Campaigns).unwrap().unwrap();
        assert_eq!(stored.high_watermark, Some(at(14)));
        assert!(repo.get_state("p1", EntityType::Ads).unwrap().is_none());
    }

    #[tokio::test]
    async fn list_states_is_ordered_parent_first() {
        let (pool, writer) = setup_test_db();
        let repo = SyncStateRepository::new(pool, writer);
        for entity_type in [EntityType::Targets, EntityType::Campaigns, EntityType::Ads] {
            repo.advance_state("p1", entity_type, SyncMode::Full, None, at(1))
                .await
                .unwrap();
        }
        let types: Vec<EntityType> = repo
            .list_states("p1")
            .unwrap()
            .into_iter()
            .map(|s| s.entity_type)
            .collect();
        assert_eq!(
            types,
            vec![EntityType::Campaigns, EntityType::Ads, EntityType::Targets]
        );
    }

    #[tokio::test]
    async fn finished_run_records_outcome_and_clamps_clock_skew() {
        let (pool, writer) = setup_test_db();
        let repo = SyncStateRepository::new(pool, writer);

        let run = repo
            .start_run("p1", EntityType::AdGroups, SyncMode::Incremental, at(9))
            .await
            .unwrap();
        assert_eq!(run.status, SyncRunStatus::Running);
        assert!(run.finished_at.is_none());

        let finished = repo
            .finish_run(
                &run.id,
                SyncRunCompletion {
                    status: SyncRunStatus::Error,
                    items_upserted: 40,
                    pages_fetched: 2,
                    warnings: vec!["skipped record without id".to_string()],
                    error: Some("HTTP 500".to_string()),
                    finished_at: at(9) - Duration::seconds(5),
                },
            )
            .await
            .unwrap();
        assert_eq!(finished.status, SyncRunStatus::Error);
        assert_eq!(finished.finished_at, Some(at(9)));
        assert_eq!(finished.items_upserted, 40);
        assert_eq!(finished.warnings, vec!["skipped record without id"]);
        assert_eq!(finished.error.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn finished_run_cannot_be_finished_again() {
        let (pool, writer) = setup_test_db();
        let repo = SyncStateRepository::new(pool, writer);
        let run = repo
            .start_run("p1", EntityType::Campaigns, SyncMode::Full, at(4))
            .await
            .unwrap();
        let completion = |status: SyncRunStatus, items: i64| SyncRunCompletion {
            status,
            items_upserted: items,
            pages_fetched: 1,
            warnings: Vec::new(),
            error: None,
            finished_at: at(5),
        };
        repo.finish_run(&run.id, completion(SyncRunStatus::Success, 12))
            .await
            .unwrap();

        let err = repo
            .finish_run(&run.id, completion(SyncRunStatus::Error, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let runs = repo.list_recent_runs("p1", 10).unwrap();
        assert_eq!(runs[0].status, SyncRunStatus::Success);
        assert_eq!(runs[0].items_upserted, 12);
    }

    #[tokio::test]
    async fn finishing_unknown_run_is_not_found() {
        let (pool, writer) = setup_test_db();
        let repo = SyncStateRepository::new(pool, writer);
        let completion = SyncRunCompletion {
            status: SyncRunStatus::Success,
            items_upserted: 0,
            pages_fetched: 0,
            warnings: Vec::new(),
            error: None,
            finished_at: at(1),
        };
        let err = repo.finish_run("missing", completion).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn recent_runs_are_newest_first_and_limited() {
        let (pool, writer) = setup_test_db();
        let repo = SyncStateRepository::new(pool, writer);
        for hour in [3, 1, 2] {
            repo.start_run("p1", EntityType::Campaigns, SyncMode::Full, at(hour))
                .await
                .unwrap();
        }
        repo.start_run("p2", EntityType::Campaigns, SyncMode::Full, at(5))
            .await
            .unwrap();

        let runs = repo.list_recent_runs("p1", 2).unwrap();
        let starts: Vec<_> = runs.iter().map(|r| r.started_at).collect();
        assert_eq!(starts, vec![at(3), at(2)]);
    }
}
