mod api;
mod config;
mod error;
mod main_lib;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env().context("Invalid configuration")?;
    let state = main_lib::build_state(&config).context("Failed to initialise services")?;
    let app = api::app_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("adpulse server listening on {}", config.listen_addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
