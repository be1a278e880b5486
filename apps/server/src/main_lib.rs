//! Service wiring for the server binary.

use std::sync::Arc;

use adpulse_ads_api::{
    AdsApiClient, ClientConfig, RateLimiter, RetryingHttpClient, TokenManager, TokenManagerConfig,
};
use adpulse_core::alerts::AlertDispatcher;
use adpulse_core::anomalies::{AnomalyDetectionService, AnomalyServiceTrait, DetectionConfig};
use adpulse_core::metrics::MetricAggregator;
use adpulse_core::sync::{SyncConfig, SyncOrchestrator, SyncServiceTrait};
use adpulse_core::Result;
use adpulse_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, AlertRepository, AnomalyRepository,
    CatalogRepository, MetricFactRepository, ProfileRepository, SyncStateRepository,
};
use tracing::info;

use crate::config::Config;

pub struct AppState {
    pub sync_service: Arc<dyn SyncServiceTrait>,
    pub anomaly_service: Arc<dyn AnomalyServiceTrait>,
}

pub fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let db_path = init(&config.database_path)?;
    run_migrations(&db_path)?;
    let pool = create_pool(&db_path)?;
    let writer = spawn_writer(pool.as_ref().clone());
    info!("Database ready at {}", db_path);

    let profile_repository = Arc::new(ProfileRepository::new(pool.clone(), writer.clone()));
    let catalog_repository = Arc::new(CatalogRepository::new(pool.clone(), writer.clone()));
    let sync_repository = Arc::new(SyncStateRepository::new(pool.clone(), writer.clone()));
    let metric_repository = Arc::new(MetricFactRepository::new(pool.clone(), writer.clone()));
    let anomaly_repository = Arc::new(AnomalyRepository::new(pool.clone(), writer.clone()));
    let alert_repository = Arc::new(AlertRepository::new(pool, writer));

    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    let http = RetryingHttpClient::new(ClientConfig::default(), limiter)?;
    let ads_client = Arc::new(AdsApiClient::new(
        http.clone(),
        &config.client_id,
        config.endpoints.clone(),
    ));
    let token_manager = Arc::new(TokenManager::new(
        http,
        profile_repository.clone(),
        TokenManagerConfig::new(&config.token_url, &config.client_id, &config.client_secret),
    ));

    let sync_service = Arc::new(SyncOrchestrator::new(
        profile_repository.clone(),
        token_manager,
        ads_client,
        catalog_repository,
        sync_repository,
        SyncConfig::default(),
    ));

    let dispatcher = Arc::new(AlertDispatcher::new(
        profile_repository.clone(),
        alert_repository,
    ));
    let anomaly_service = Arc::new(AnomalyDetectionService::new(
        profile_repository,
        anomaly_repository,
        MetricAggregator::new(metric_repository),
        dispatcher,
        DetectionConfig::default(),
    ));

    Ok(Arc::new(AppState {
        sync_service,
        anomaly_service,
    }))
}
