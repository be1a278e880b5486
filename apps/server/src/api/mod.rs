mod anomalies;
mod health;
mod sync;

use std::sync::Arc;

use axum::Router;

use crate::main_lib::AppState;

pub fn app_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(sync::router())
        .merge(anomalies::router());
    Router::new()
        .nest("/api/v1", api)
        .merge(health::router())
        .with_state(state)
}
