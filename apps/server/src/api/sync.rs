//! Catalog sync trigger and status endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use adpulse_core::sync::{SyncMode, SyncStatusReport, SyncSummary, SyncTarget};

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

const DEFAULT_RUN_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTriggerQuery {
    pub profile_id: Option<String>,
    pub entity: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStateQuery {
    pub profile_id: Option<String>,
    pub limit: Option<i64>,
}

fn required_profile(profile_id: Option<String>) -> ApiResult<String> {
    profile_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("profileId is required".to_string()))
}

async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SyncTriggerQuery>,
) -> ApiResult<Json<SyncSummary>> {
    let profile_id = required_profile(query.profile_id)?;
    let target = query
        .entity
        .as_deref()
        .map(str::parse::<SyncTarget>)
        .transpose()?
        .unwrap_or(SyncTarget::All);
    let mode = query
        .mode
        .as_deref()
        .map(str::parse::<SyncMode>)
        .transpose()?
        .unwrap_or(SyncMode::Incremental);

    info!("Sync requested for profile {} ({:?}, {})", profile_id, target, mode);
    let summary = state
        .sync_service
        .sync_profile(&profile_id, target, mode)
        .await?;
    if !summary.success {
        warn!(
            "Sync for profile {} finished with errors: {:?}",
            profile_id, summary.errors
        );
    }
    Ok(Json(summary))
}

async fn get_sync_state(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SyncStateQuery>,
) -> ApiResult<Json<SyncStatusReport>> {
    let profile_id = required_profile(query.profile_id)?;
    let limit = query.limit.unwrap_or(DEFAULT_RUN_LIMIT).clamp(1, 500);
    let report = state.sync_service.get_sync_status(&profile_id, limit)?;
    Ok(Json(report))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync", post(trigger_sync))
        .route("/sync/state", get(get_sync_state))
}
