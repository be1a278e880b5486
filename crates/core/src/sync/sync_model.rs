//! Sync bookkeeping models: runs, per-entity state and job summaries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::EntityType;
use crate::errors::Error;

/// Retry policy classification for upstream API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Classify HTTP status into retry behavior. 429 is the only retried 4xx.
pub fn classify_http_status(status: u16) -> RetryClass {
    match status {
        401 | 403 => RetryClass::ReauthRequired,
        429 | 500..=599 => RetryClass::Retryable,
        _ => RetryClass::Permanent,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Full,
    Incremental,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Full => "full",
            SyncMode::Incremental => "incremental",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "full" => Ok(SyncMode::Full),
            "incremental" => Ok(SyncMode::Incremental),
            other => Err(Error::validation(format!("Unknown sync mode '{}'", other))),
        }
    }
}

/// Which collections one sync job covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    One(EntityType),
    All,
}

impl SyncTarget {
    pub fn entity_types(&self) -> Vec<EntityType> {
        match self {
            SyncTarget::One(entity_type) => vec![*entity_type],
            SyncTarget::All => EntityType::ALL.to_vec(),
        }
    }
}

impl FromStr for SyncTarget {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "all" => Ok(SyncTarget::All),
            other => other.parse::<EntityType>().map(SyncTarget::One),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunStatus {
    Running,
    Success,
    Error,
}

impl SyncRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncRunStatus::Running => "running",
            SyncRunStatus::Success => "success",
            SyncRunStatus::Error => "error",
        }
    }
}

impl FromStr for SyncRunStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "running" => Ok(SyncRunStatus::Running),
            "success" => Ok(SyncRunStatus::Success),
            "error" => Ok(SyncRunStatus::Error),
            other => Err(Error::validation(format!("Unknown run status '{}'", other))),
        }
    }
}

/// Durable cursor for one (profile, entity type) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub profile_id: String,
    pub entity_type: EntityType,
    pub high_watermark: Option<DateTime<Utc>>,
    pub last_full_sync_at: Option<DateTime<Utc>>,
    pub last_incremental_sync_at: Option<DateTime<Utc>>,
}

/// Audit record of one entity-type sync attempt. Immutable once finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub id: String,
    pub profile_id: String,
    pub entity_type: EntityType,
    pub mode: SyncMode,
    pub status: SyncRunStatus,
    pub items_upserted: i64,
    pub pages_fetched: i64,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Terminal values written to a run when it leaves `running`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRunCompletion {
    pub status: SyncRunStatus,
    pub items_upserted: i64,
    pub pages_fetched: i64,
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySyncResult {
    pub entity_type: EntityType,
    pub run_id: String,
    pub status: SyncRunStatus,
    pub items_upserted: i64,
    pub pages_fetched: i64,
    pub skipped: usize,
    pub high_watermark: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Response of one sync job. Partial success is explicit: some entity types may
/// succeed while others carry an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub profile_id: String,
    pub mode: SyncMode,
    pub success: bool,
    pub items_upserted: i64,
    pub pages_fetched: i64,
    pub results: Vec<EntitySyncResult>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl SyncSummary {
    pub fn new(profile_id: &str, mode: SyncMode) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            mode,
            success: true,
            items_upserted: 0,
            pages_fetched: 0,
            results: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, result: EntitySyncResult, warnings: Vec<String>) {
        self.items_upserted += result.items_upserted;
        self.pages_fetched += result.pages_fetched;
        self.warnings.extend(
            warnings
                .into_iter()
                .map(|w| format!("{}: {}", result.entity_type, w)),
        );
        if let Some(error) = &result.error {
            self.success = false;
            self.errors.push(format!("{}: {}", result.entity_type, error));
        }
        self.results.push(result);
    }
}
