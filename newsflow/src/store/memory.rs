//! In-memory store implementations.
//!
//! Backed by `DashMap`; entry guards give per-key atomicity without a
//! store-wide lock. Useful for tests and single-process runs that do not
//! need durability.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::article::ArticleId;
use crate::errors::{ResumeError, StoreError};
use crate::run::{PublishedRecord, RunState};
use crate::store::{ArticleStore, CheckpointStore, RunMutator, UpdateError};

/// In-memory published-article set.
#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    records: DashMap<ArticleId, PublishedRecord>,
}

impl MemoryArticleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded articles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn is_published(&self, id: &ArticleId) -> Result<bool, StoreError> {
        Ok(self.records.contains_key(id))
    }

    async fn record_published(&self, record: PublishedRecord) -> Result<bool, StoreError> {
        match self.records.entry(record.article_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    async fn get(&self, id: &ArticleId) -> Result<Option<PublishedRecord>, StoreError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }
}

/// In-memory checkpoint store.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    runs: DashMap<String, RunState>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save_run(&self, run: &RunState) -> Result<(), StoreError> {
        self.runs.insert(run.run_id.clone(), run.clone());
        Ok(())
    }

    async fn load_run(&self, run_id: &str) -> Result<Option<RunState>, StoreError> {
        Ok(self.runs.get(run_id).map(|entry| entry.value().clone()))
    }

    async fn update_run(&self, run_id: &str, mutate: RunMutator) -> Result<RunState, UpdateError> {
        // The occupied entry holds the shard guard for the whole
        // read-modify-write, so racing updates to one run id serialize here.
        match self.runs.entry(run_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let mut updated = entry.get().clone();
                mutate(&mut updated)?;
                entry.insert(updated.clone());
                Ok(updated)
            }
            Entry::Vacant(_) => Err(UpdateError::Rejected(ResumeError::RunNotFound {
                run_id: run_id.to_string(),
            })),
        }
    }
}
