use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use survey_server::config::Config;
use survey_server::http::router;
use survey_server::{open_repository, session_sweep_loop, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting satisfaction survey server v{}", survey_server::get_version());

    let config = Config::from_env().context("Failed to load configuration from environment variables")?;
    info!(
        "Storage backend: {}, locale: {}",
        config.storage.backend_name(),
        config.locale
    );

    let repository = open_repository(&config.storage)
        .await
        .context("Failed to open feedback storage")?;

    let app_state = Arc::new(AppState::new(repository, config.locale));

    info!("Evicting sessions idle for more than {:?}", config.session_ttl);
    tokio::spawn(session_sweep_loop(
        app_state.store.clone(),
        config.session_ttl,
    ));

    let app = router(app_state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
