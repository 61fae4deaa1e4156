//! Fan-out fetch stage: concurrent per-source fetches behind a
//! wait-for-all-or-timeout barrier.
//!
//! A single source's failure never aborts the others; failed or timed-out
//! branches surface as structured per-source errors alongside the combined
//! candidate set. Branch results are joined in source order so curation
//! tie-breaks are reproducible.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::article::{Article, CandidateSet};
use crate::errors::FetchError;

/// One configured feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Human-readable source name (e.g., "ArXiv AI").
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Source category (e.g., "research", "press").
    #[serde(default)]
    pub category: String,
}

impl SourceDescriptor {
    /// Creates a source descriptor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category: category.into(),
        }
    }
}

/// Collaborator contract for fetching one source.
///
/// Implementations must not fail on malformed feed content; they return a
/// `FetchError` describing the problem instead. Returned articles are already
/// restricted to the trailing `window_hours`.
#[async_trait]
pub trait FetchSource: Send + Sync {
    /// Fetches articles from one source within the time window.
    async fn fetch(
        &self,
        source: &SourceDescriptor,
        window_hours: u32,
    ) -> Result<Vec<Article>, FetchError>;
}

/// Result of the fan-out stage for one run.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Union of all successful branches, in source-then-article order.
    pub candidates: CandidateSet,
    /// Per-source errors from failed or timed-out branches.
    pub errors: Vec<FetchError>,
}

/// Runs all sources concurrently and joins the results.
///
/// Each branch races `per_source_timeout`; a branch that loses the race
/// contributes a timeout error instead of articles.
pub async fn fetch_all(
    fetcher: &Arc<dyn FetchSource>,
    sources: &[SourceDescriptor],
    window_hours: u32,
    per_source_timeout: Duration,
) -> FetchOutcome {
    let branches = sources.iter().map(|source| {
        let fetcher = Arc::clone(fetcher);
        let source = source.clone();
        async move {
            match tokio::time::timeout(per_source_timeout, fetcher.fetch(&source, window_hours))
                .await
            {
                Ok(Ok(articles)) => Ok((source, articles)),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(FetchError::timeout(&source.name, per_source_timeout)),
            }
        }
    });

    let mut outcome = FetchOutcome::default();
    for branch in join_all(branches).await {
        match branch {
            Ok((source, articles)) => {
                tracing::debug!(
                    source = %source.name,
                    count = articles.len(),
                    "source fetch complete"
                );
                outcome.candidates.extend(articles);
            }
            Err(err) => {
                tracing::warn!(source = %err.source, error = %err, "source fetch failed");
                outcome.errors.push(err);
            }
        }
    }
    outcome
}
