use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{SyncMode, SyncRun, SyncRunCompletion, SyncState};
use crate::catalog::EntityType;
use crate::errors::Result;
use crate::profiles::Region;

#[async_trait]
pub trait SyncStateRepositoryTrait: Send + Sync {
    fn get_state(&self, profile_id: &str, entity_type: EntityType) -> Result<Option<SyncState>>;

    fn list_states(&self, profile_id: &str) -> Result<Vec<SyncState>>;

    fn list_recent_runs(&self, profile_id: &str, limit: i64) -> Result<Vec<SyncRun>>;

    /// Inserts a new run in the `running` state.
    async fn start_run(
        &self,
        profile_id: &str,
        entity_type: EntityType,
        mode: SyncMode,
        started_at: DateTime<Utc>,
    ) -> Result<SyncRun>;

    /// Moves a running run to its terminal state. `finished_at` is clamped so it
    /// never precedes `started_at`.
    async fn finish_run(&self, run_id: &str, completion: SyncRunCompletion) -> Result<SyncRun>;

    /// Records a successful sync. The stored watermark becomes
    /// `max(stored, candidate)`, so it never moves backward.
    async fn advance_state(
        &self,
        profile_id: &str,
        entity_type: EntityType,
        mode: SyncMode,
        candidate_watermark: Option<DateTime<Utc>>,
        synced_at: DateTime<Utc>,
    ) -> Result<SyncState>;
}

/// Per-call identity for the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub profile_id: String,
    pub region: Region,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub entity_type: EntityType,
    pub offset: usize,
    pub count: usize,
    /// Only items updated after this instant.
    pub since: Option<DateTime<Utc>>,
}

/// One page of a remote collection, raw.
#[async_trait]
pub trait EntityPageSource: Send + Sync {
    async fn fetch_page(&self, ctx: &RequestContext, request: &PageRequest) -> Result<Vec<Value>>;
}
