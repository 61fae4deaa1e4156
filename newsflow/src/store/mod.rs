//! Durable shared stores: published-article records and run checkpoints.
//!
//! Both stores are process-wide shared state mutated under per-key
//! transactions (per article id, per run id) — never a single global lock.
//! `update_run` is the keyed read-modify-write primitive behind the
//! exactly-once decision guarantee.

mod file;
mod memory;

pub use file::{FileArticleStore, FileCheckpointStore};
pub use memory::{MemoryArticleStore, MemoryCheckpointStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::article::ArticleId;
use crate::errors::{ResumeError, StoreError};
use crate::run::{PublishedRecord, RunState};

/// Keyed mutation applied atomically to one run's state.
pub type RunMutator = Box<dyn FnOnce(&mut RunState) -> Result<(), ResumeError> + Send>;

/// Error from a keyed run update.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The store itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The mutation was rejected; nothing was persisted.
    #[error(transparent)]
    Rejected(#[from] ResumeError),
}

/// Durable set of previously-published articles.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Membership check for the duplicate-prevention invariant.
    async fn is_published(&self, id: &ArticleId) -> Result<bool, StoreError>;

    /// Insert-if-absent. Returns `false` when the id was already present;
    /// the existing record is left untouched (idempotent no-op).
    async fn record_published(&self, record: PublishedRecord) -> Result<bool, StoreError>;

    /// Fetches the record for an id, if any.
    async fn get(&self, id: &ArticleId) -> Result<Option<PublishedRecord>, StoreError>;
}

/// Durable key-value record of in-flight runs and their suspended state.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persists the full run state, overwriting any previous checkpoint.
    async fn save_run(&self, run: &RunState) -> Result<(), StoreError>;

    /// Loads a run by id. `Ok(None)` when the id is unknown.
    async fn load_run(&self, run_id: &str) -> Result<Option<RunState>, StoreError>;

    /// Atomic read-modify-write for one run id. Concurrent updates to the
    /// same id are serialized; a rejected mutation persists nothing.
    async fn update_run(&self, run_id: &str, mutate: RunMutator) -> Result<RunState, UpdateError>;
}
