//! In-memory implementation of `FeedbackRepository`.
//!
//! Records live in a `Vec` and are lost on restart. Used by tests and by
//! `STORAGE_BACKEND=memory`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{FeedbackRepository, RepositoryError};
use crate::state_machine::state::FeedbackRecord;

/// In-memory feedback repository.
pub struct InMemoryRepository {
    records: RwLock<Vec<FeedbackRecord>>,
    /// When set, every insert fails as if the database were unreachable.
    unavailable: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// A repository whose inserts always fail.
    pub fn unavailable() -> Self {
        let repo = Self::new();
        repo.set_unavailable(true);
        repo
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of everything inserted so far, oldest first.
    pub async fn records(&self) -> Vec<FeedbackRecord> {
        self.records.read().await.clone()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryRepository {
    async fn insert(&self, record: &FeedbackRecord) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::connection("in-memory store marked unavailable"));
        }
        let mut records = self.records.write().await;
        records.push(record.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
