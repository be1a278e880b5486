use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::paged_fetcher::{PagedEntityFetcher, DEFAULT_PAGE_SIZE};
use super::{
    EntityPageSource, EntitySyncResult, RequestContext, SyncMode, SyncRun, SyncRunCompletion,
    SyncRunStatus, SyncState, SyncStateRepositoryTrait, SyncSummary, SyncTarget,
};
use crate::catalog::{CatalogRepositoryTrait, EntityType, EntityUpserter};
use crate::errors::{Error, Result};
use crate::profiles::{AccessTokenProvider, Profile, ProfileRepositoryTrait};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub page_size: usize,
    /// Re-read window behind the stored watermark on incremental runs.
    pub incremental_overlap: Duration,
    /// How far back an incremental run reaches when no watermark exists yet.
    pub initial_backfill: Duration,
    /// Pause between entity types of one `all` job.
    pub inter_entity_delay: StdDuration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            incremental_overlap: Duration::hours(25),
            initial_backfill: Duration::days(30),
            inter_entity_delay: StdDuration::from_millis(500),
        }
    }
}

/// Recent state and runs for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusReport {
    pub states: Vec<SyncState>,
    pub runs: Vec<SyncRun>,
}

#[async_trait]
pub trait SyncServiceTrait: Send + Sync {
    /// Syncs the requested entity types of one profile, sequentially.
    async fn sync_profile(
        &self,
        profile_id: &str,
        target: SyncTarget,
        mode: SyncMode,
    ) -> Result<SyncSummary>;

    fn get_sync_status(&self, profile_id: &str, run_limit: i64) -> Result<SyncStatusReport>;
}

/// Computes the `since` filter for a run. Full runs read everything.
pub fn compute_since_cursor(
    mode: SyncMode,
    state: Option<&SyncState>,
    now: DateTime<Utc>,
    config: &SyncConfig,
) -> Option<DateTime<Utc>> {
    match mode {
        SyncMode::Full => None,
        SyncMode::Incremental => Some(
            match state.and_then(|s| s.high_watermark) {
                Some(watermark) => watermark - config.incremental_overlap,
                None => now - config.initial_backfill,
            },
        ),
    }
}

/// Progress of one entity-type run before it is finalized.
#[derive(Default)]
struct RunProgress {
    items_upserted: i64,
    pages_fetched: i64,
    warnings: Vec<String>,
    max_last_updated: Option<DateTime<Utc>>,
}

pub struct SyncOrchestrator {
    profile_repository: Arc<dyn ProfileRepositoryTrait>,
    token_provider: Arc<dyn AccessTokenProvider>,
    page_source: Arc<dyn EntityPageSource>,
    sync_repository: Arc<dyn SyncStateRepositoryTrait>,
    upserter: EntityUpserter,
    config: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(
        profile_repository: Arc<dyn ProfileRepositoryTrait>,
        token_provider: Arc<dyn AccessTokenProvider>,
        page_source: Arc<dyn EntityPageSource>,
        catalog_repository: Arc<dyn CatalogRepositoryTrait>,
        sync_repository: Arc<dyn SyncStateRepositoryTrait>,
        config: SyncConfig,
    ) -> Self {
        Self {
            profile_repository,
            token_provider,
            page_source,
            sync_repository,
            upserter: EntityUpserter::new(catalog_repository),
            config,
        }
    }

    async fn load_context(&self, profile_id: &str) -> Result<(Profile, RequestContext)> {
        let profile = self
            .profile_repository
            .get_profile(profile_id)?
            .ok_or_else(|| Error::not_found(format!("Profile {} not found", profile_id)))?;
        if !profile.is_active {
            return Err(Error::validation(format!(
                "Profile {} is not active",
                profile_id
            )));
        }
        let access_token = self.token_provider.ensure_access_token(&profile).await?;
        let ctx = RequestContext {
            profile_id: profile.profile_id.clone(),
            region: profile.region,
            access_token,
        };
        Ok((profile, ctx))
    }

    async fn fetch_and_upsert(
        &self,
        ctx: &RequestContext,
        entity_type: EntityType,
        since: Option<DateTime<Utc>>,
        progress: &mut RunProgress,
    ) -> Result<()> {
        let mut fetcher = PagedEntityFetcher::new(
            self.page_source.as_ref(),
            ctx,
            entity_type,
            self.config.page_size,
            since,
        );
        let result = async {
            while let Some(page) = fetcher.next_page().await? {
                let outcome = self
                    .upserter
                    .upsert_page(&ctx.profile_id, entity_type, page)
                    .await?;
                progress.items_upserted += outcome.upserted as i64;
                progress.warnings.extend(outcome.skipped);
                if let Some(updated) = outcome.max_last_updated {
                    progress.max_last_updated = Some(match progress.max_last_updated {
                        Some(current) if current >= updated => current,
                        _ => updated,
                    });
                }
            }
            Ok::<(), Error>(())
        }
        .await;
        progress.pages_fetched = fetcher.pages_fetched() as i64;
        result
    }

    /// Runs one entity type to completion. Returns `Err` only when the run row
    /// cannot be written; any other failure ends the run in the `error` state
    /// with the watermark untouched.
    async fn sync_entity_type(
        &self,
        ctx: &RequestContext,
        entity_type: EntityType,
        mode: SyncMode,
    ) -> Result<(EntitySyncResult, Vec<String>, bool)> {
        let profile_id = ctx.profile_id.as_str();
        let state = self.sync_repository.get_state(profile_id, entity_type)?;
        let started_at = Utc::now();
        let since = compute_since_cursor(mode, state.as_ref(), started_at, &self.config);
        let run = self
            .sync_repository
            .start_run(profile_id, entity_type, mode, started_at)
            .await?;
        info!(
            "Sync run {} started: profile={} entity={} mode={} since={:?}",
            run.id, profile_id, entity_type, mode, since
        );

        let mut progress = RunProgress::default();
        let outcome = self
            .fetch_and_upsert(ctx, entity_type, since, &mut progress)
            .await;

        let finished_at = Utc::now();
        let outcome = match outcome {
            Ok(()) => {
                self.sync_repository
                    .advance_state(
                        profile_id,
                        entity_type,
                        mode,
                        progress.max_last_updated,
                        finished_at,
                    )
                    .await
            }
            Err(err) => Err(err),
        };
        let (status, error, auth_failed, watermark) = match outcome {
            Ok(advanced) => (SyncRunStatus::Success, None, false, advanced.high_watermark),
            Err(err) => {
                error!(
                    "Sync run {} failed: profile={} entity={}: {}",
                    run.id, profile_id, entity_type, err
                );
                let auth_failed = err.is_auth_failure();
                (
                    SyncRunStatus::Error,
                    Some(err.to_string()),
                    auth_failed,
                    state.and_then(|s| s.high_watermark),
                )
            }
        };

        let finished = self
            .sync_repository
            .finish_run(
                &run.id,
                SyncRunCompletion {
                    status,
                    items_upserted: progress.items_upserted,
                    pages_fetched: progress.pages_fetched,
                    warnings: progress.warnings.clone(),
                    error: error.clone(),
                    finished_at,
                },
            )
            .await?;
        debug!(
            "Sync run {} finished with status {} ({} items, {} pages)",
            finished.id,
            finished.status.as_str(),
            finished.items_upserted,
            finished.pages_fetched
        );

        let result = EntitySyncResult {
            entity_type,
            run_id: finished.id,
            status,
            items_upserted: progress.items_upserted,
            pages_fetched: progress.pages_fetched,
            skipped: progress.warnings.len(),
            high_watermark: watermark,
            error,
        };
        Ok((result, progress.warnings, auth_failed))
    }
}

#[async_trait]
impl SyncServiceTrait for SyncOrchestrator {
    async fn sync_profile(
        &self,
        profile_id: &str,
        target: SyncTarget,
        mode: SyncMode,
    ) -> Result<SyncSummary> {
        let (_profile, ctx) = self.load_context(profile_id).await?;
        let mut summary = SyncSummary::new(profile_id, mode);
        let entity_types = target.entity_types();

        for (index, entity_type) in entity_types.iter().enumerate() {
            if index > 0 && !self.config.inter_entity_delay.is_zero() {
                tokio::time::sleep(self.config.inter_entity_delay).await;
            }
            let (result, warnings, auth_failed) =
                self.sync_entity_type(&ctx, *entity_type, mode).await?;
            summary.push(result, warnings);

            if auth_failed {
                let remaining = &entity_types[index + 1..];
                if !remaining.is_empty() {
                    warn!(
                        "Authentication failed for profile {}; skipping {} remaining entity type(s)",
                        profile_id,
                        remaining.len()
                    );
                    for skipped in remaining {
                        summary.errors.push(format!(
                            "{}: skipped after authentication failure",
                            skipped
                        ));
                    }
                }
                break;
            }
        }

        info!(
            "Sync for profile {} finished: success={} items={} pages={} warnings={} errors={}",
            profile_id,
            summary.success,
            summary.items_upserted,
            summary.pages_fetched,
            summary.warnings.len(),
            summary.errors.len()
        );
        Ok(summary)
    }

    fn get_sync_status(&self, profile_id: &str, run_limit: i64) -> Result<SyncStatusReport> {
        Ok(SyncStatusReport {
            states: self.sync_repository.list_states(profile_id)?,
            runs: self
                .sync_repository
                .list_recent_runs(profile_id, run_limit)?,
        })
    }
}
