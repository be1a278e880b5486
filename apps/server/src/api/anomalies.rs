//! Anomaly detection trigger and listing endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use adpulse_core::anomalies::{Anomaly, DetectionSummary};
use adpulse_core::metrics::{Scope, TimeWindow};

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectQuery {
    pub profile_id: Option<String>,
    pub scope: Option<String>,
    pub window: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAnomaliesQuery {
    pub profile_id: Option<String>,
    pub limit: Option<i64>,
}

async fn detect_anomalies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DetectQuery>,
) -> ApiResult<Json<DetectionSummary>> {
    let profile_id = query
        .profile_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    let scope = query
        .scope
        .as_deref()
        .map(str::parse::<Scope>)
        .transpose()?
        .unwrap_or(Scope::Campaign);
    let window = query
        .window
        .as_deref()
        .map(str::parse::<TimeWindow>)
        .transpose()?
        .unwrap_or(TimeWindow::Daily);

    info!(
        "Anomaly detection requested for {} ({}, {})",
        profile_id.as_deref().unwrap_or("all active profiles"),
        scope.as_str(),
        window.as_str()
    );
    let summary = state
        .anomaly_service
        .detect(profile_id.as_deref(), scope, window, Utc::now())
        .await?;
    Ok(Json(summary))
}

async fn list_anomalies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAnomaliesQuery>,
) -> ApiResult<Json<Vec<Anomaly>>> {
    let profile_id = query
        .profile_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("profileId is required".to_string()))?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    Ok(Json(state.anomaly_service.list_anomalies(&profile_id, limit)?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/anomalies", get(list_anomalies))
        .route("/anomalies/detect", post(detect_anomalies))
}
