//! File-backed JSON store implementations, durable across process restarts.
//!
//! One JSON file per key (run id or article id), written to a temporary
//! sibling and renamed into place. A per-key mutex map serializes in-process
//! writers on the same key; distinct keys never contend.

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::article::ArticleId;
use crate::errors::{ResumeError, StoreError};
use crate::run::{PublishedRecord, RunState};
use crate::store::{ArticleStore, CheckpointStore, RunMutator, UpdateError};

/// Maps an opaque key to a safe file name. Keys made only of path-safe
/// characters keep their readable form; anything else falls back to a hash.
fn file_name(key: &str) -> String {
    let safe = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if safe {
        format!("{key}.json")
    } else {
        let digest = Sha256::digest(key.as_bytes());
        format!("{}.json", hex::encode(&digest[..12]))
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// File-backed checkpoint store: one JSON file per run.
#[derive(Debug)]
pub struct FileCheckpointStore {
    dir: PathBuf,
    // Grows one entry per run id seen by this process (one per day under
    // the daily cadence); reclaimed only on restart. Entries are never
    // removed while live: a waiter and a fresh entry on the same key would
    // otherwise lock different mutexes.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileCheckpointStore {
    /// Opens (creating if needed) a checkpoint directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: DashMap::new(),
        })
    }

    fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(file_name(run_id))
    }

    fn lock_for(&self, run_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(run_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save_run(&self, run: &RunState) -> Result<(), StoreError> {
        let lock = self.lock_for(&run.run_id);
        let _guard = lock.lock().await;
        let bytes = serde_json::to_vec_pretty(run)?;
        write_atomic(&self.path_for(&run.run_id), &bytes).await
    }

    async fn load_run(&self, run_id: &str) -> Result<Option<RunState>, StoreError> {
        read_json(&self.path_for(run_id)).await
    }

    async fn update_run(&self, run_id: &str, mutate: RunMutator) -> Result<RunState, UpdateError> {
        let lock = self.lock_for(run_id);
        let _guard = lock.lock().await;

        let Some(mut run) = read_json::<RunState>(&self.path_for(run_id)).await? else {
            return Err(UpdateError::Rejected(ResumeError::RunNotFound {
                run_id: run_id.to_string(),
            }));
        };
        mutate(&mut run)?;
        let bytes = serde_json::to_vec_pretty(&run).map_err(StoreError::from)?;
        write_atomic(&self.path_for(run_id), &bytes).await?;
        Ok(run)
    }
}

/// File-backed published-article store: one JSON file per article id.
#[derive(Debug)]
pub struct FileArticleStore {
    dir: PathBuf,
    // Same bound as FileCheckpointStore: one entry per article id written
    // by this process, reclaimed on restart.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileArticleStore {
    /// Opens (creating if needed) a record directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: DashMap::new(),
        })
    }

    fn path_for(&self, id: &ArticleId) -> PathBuf {
        // Article ids are hex, so their readable form is always path-safe.
        self.dir.join(file_name(id.as_str()))
    }

    fn lock_for(&self, id: &ArticleId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl ArticleStore for FileArticleStore {
    async fn is_published(&self, id: &ArticleId) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(&self.path_for(id)).await?)
    }

    async fn record_published(&self, record: PublishedRecord) -> Result<bool, StoreError> {
        let lock = self.lock_for(&record.article_id);
        let _guard = lock.lock().await;

        let path = self.path_for(&record.article_id);
        if tokio::fs::try_exists(&path).await? {
            return Ok(false);
        }
        let bytes = serde_json::to_vec_pretty(&record)?;
        write_atomic(&path, &bytes).await?;
        Ok(true)
    }

    async fn get(&self, id: &ArticleId) -> Result<Option<PublishedRecord>, StoreError> {
        read_json(&self.path_for(id)).await
    }
}
