pub mod config;
pub mod http;
pub mod reply;
pub mod state_machine;
pub mod validate;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info, warn};

pub use config::{Config, StorageConfig};
pub use reply::Locale;
pub use state_machine::{SessionId, SessionStore};

use state_machine::{
    FeedbackRepository, InMemoryRepository, PostgresRepository, RepositoryError, SqliteRepository,
};

pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub struct AppState {
    pub store: Arc<SessionStore>,
}

impl AppState {
    pub fn new(repository: Arc<dyn FeedbackRepository>, locale: Locale) -> Self {
        Self {
            store: Arc::new(SessionStore::new(repository, locale)),
        }
    }
}

/// How often the server looks for idle sessions.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Evict sessions idle for longer than `ttl`, forever.
pub async fn session_sweep_loop(store: Arc<SessionStore>, ttl: Duration) {
    let ttl = match chrono::Duration::from_std(ttl) {
        Ok(ttl) => ttl,
        Err(e) => {
            error!("Session TTL out of range, idle sessions will not be evicted: {}", e);
            return;
        }
    };
    let mut interval = interval(SESSION_SWEEP_INTERVAL);

    loop {
        interval.tick().await;
        store.evict_idle(Utc::now() - ttl).await;
    }
}

/// Open the configured feedback backend.
///
/// A PostgreSQL server that is down at startup is not fatal: each insert
/// connects on its own, so the schema check is retried by the next process.
pub async fn open_repository(
    storage: &StorageConfig,
) -> Result<Arc<dyn FeedbackRepository>, RepositoryError> {
    match storage {
        StorageConfig::Memory => {
            warn!("Using in-memory storage; feedback is lost on exit");
            Ok(Arc::new(InMemoryRepository::new()))
        }
        StorageConfig::Sqlite { path } => {
            info!("Using SQLite database: {}", path.display());
            Ok(Arc::new(SqliteRepository::new(path)?))
        }
        StorageConfig::Postgres(pg) => {
            info!("Using PostgreSQL database: {}", pg.display_target());
            let repo = PostgresRepository::new(pg.clone());
            if let Err(e) = repo.ensure_schema().await {
                warn!("Could not prepare feedback table: {}", e);
            }
            Ok(Arc::new(repo))
        }
    }
}
