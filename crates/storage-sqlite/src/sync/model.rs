use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use adpulse_core::sync::{SyncRun, SyncState};
use adpulse_core::Result;

use crate::utils::{enum_from_db, opt_ts_from_db, ts_from_db};

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
#[diesel(table_name = crate::schema::sync_state)]
#[diesel(primary_key(profile_id, entity_type))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncStateDB {
    pub profile_id: String,
    pub entity_type: String,
    pub high_watermark: Option<String>,
    pub last_full_sync_at: Option<String>,
    pub last_incremental_sync_at: Option<String>,
}

impl TryFrom<SyncStateDB> for SyncState {
    type Error = adpulse_core::Error;

    fn try_from(db: SyncStateDB) -> Result<Self> {
        Ok(SyncState {
            entity_type: enum_from_db(&db.entity_type)?,
            high_watermark: opt_ts_from_db(db.high_watermark.as_deref())?,
            last_full_sync_at: opt_ts_from_db(db.last_full_sync_at.as_deref())?,
            last_incremental_sync_at: opt_ts_from_db(db.last_incremental_sync_at.as_deref())?,
            profile_id: db.profile_id,
        })
    }
}

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
#[diesel(table_name = crate::schema::sync_runs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncRunDB {
    pub id: String,
    pub profile_id: String,
    pub entity_type: String,
    pub mode: String,
    pub status: String,
    pub items_upserted: i64,
    pub pages_fetched: i64,
    /// JSON array of strings.
    pub warnings: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub error: Option<String>,
}

impl TryFrom<SyncRunDB> for SyncRun {
    type Error = adpulse_core::Error;

    fn try_from(db: SyncRunDB) -> Result<Self> {
        Ok(SyncRun {
            entity_type: enum_from_db(&db.entity_type)?,
            mode: db.mode.parse()?,
            status: db.status.parse()?,
            warnings: serde_json::from_str(&db.warnings)?,
            started_at: ts_from_db(&db.started_at)?,
            finished_at: opt_ts_from_db(db.finished_at.as_deref())?,
            id: db.id,
            profile_id: db.profile_id,
            items_upserted: db.items_upserted,
            pages_fetched: db.pages_fetched,
            error: db.error,
        })
    }
}
