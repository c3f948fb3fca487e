//! Repository abstraction for feedback persistence.
//!
//! This module defines the `FeedbackRepository` trait that abstracts the
//! single write the survey performs. Implementations provide different
//! backends (in-memory, SQLite, PostgreSQL).

mod memory;
mod postgres;
mod sqlite;

pub use memory::InMemoryRepository;
pub use postgres::{PostgresConfig, PostgresRepository};
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use std::fmt;

use super::state::FeedbackRecord;

/// Errors from a feedback backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Could not reach or open the database.
    Connection { message: String },
    /// A statement against an open database failed.
    Storage { operation: String, message: String },
}

impl RepositoryError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { message } => write!(f, "database connection failed: {}", message),
            Self::Storage { operation, message } => {
                write!(f, "database {} failed: {}", operation, message)
            }
        }
    }
}

impl std::error::Error for RepositoryError {}

/// Repository trait for persisting confirmed survey responses.
///
/// The state machine emits one `InsertFeedback` effect per completed survey;
/// the interpreter hands that record to `insert` and turns the result into
/// a `FeedbackSaved` or `FeedbackSaveFailed` event.
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Insert one record. Not retried on failure.
    async fn insert(&self, record: &FeedbackRecord) -> Result<(), RepositoryError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
