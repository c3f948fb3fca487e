//! PostgreSQL implementation of `FeedbackRepository`.
//!
//! Every insert opens its own connection, runs one statement and closes the
//! connection again. There is no pool and no retry.

use std::fmt;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info, warn};

use super::{FeedbackRepository, RepositoryError};
use crate::state_machine::state::FeedbackRecord;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS feedback (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        rating INTEGER NOT NULL CHECK (rating BETWEEN 0 AND 10),
        comment TEXT,
        response_time TIMESTAMP NOT NULL
    );
"#;

const INSERT_SQL: &str = "INSERT INTO feedback (name, email, rating, comment, response_time)
     VALUES ($1, $2, $3, $4, $5)";

/// Connection parameters for the feedback database.
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl PostgresConfig {
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user);
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        config
    }

    /// `user@host:port/dbname`, safe to log.
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.dbname)
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// PostgreSQL-backed feedback repository.
pub struct PostgresRepository {
    config: PostgresConfig,
}

impl PostgresRepository {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    /// Open a connection. The returned task drives it and ends once the
    /// client is dropped.
    async fn connect(&self) -> Result<(Client, JoinHandle<()>), RepositoryError> {
        let (client, connection) = self
            .config
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| {
                RepositoryError::connection(format!("{}: {}", self.config.display_target(), e))
            })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("PostgreSQL connection error: {}", e);
            }
        });

        Ok((client, driver))
    }

    /// Create the feedback table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        let (client, driver) = self.connect().await?;
        let result = client
            .batch_execute(CREATE_TABLE_SQL)
            .await
            .map_err(|e| RepositoryError::storage("create feedback table", e.to_string()));
        close(client, driver).await;
        result?;

        info!(
            "Feedback table ready on {}",
            self.config.display_target()
        );
        Ok(())
    }
}

async fn close(client: Client, driver: JoinHandle<()>) {
    drop(client);
    if let Err(e) = driver.await {
        warn!("PostgreSQL connection task failed: {}", e);
    }
}

#[async_trait]
impl FeedbackRepository for PostgresRepository {
    async fn insert(&self, record: &FeedbackRecord) -> Result<(), RepositoryError> {
        let (client, driver) = self.connect().await?;

        let rating = i32::from(record.rating.value());
        let response_time = record.response_time.naive_utc();
        let result = client
            .execute(
                INSERT_SQL,
                &[
                    &record.name,
                    &record.email.as_str(),
                    &rating,
                    &record.comment,
                    &response_time,
                ],
            )
            .await
            .map_err(|e| RepositoryError::storage("insert", e.to_string()));

        close(client, driver).await;
        let rows = result?;
        debug!("Inserted {} feedback row(s)", rows);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
