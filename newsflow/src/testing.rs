//! Mock collaborators and fixtures for tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::article::{Article, ArticleId};
use crate::draft::{DraftGenerator, Platform, StyleConfig};
use crate::errors::{FetchError, GenerationError, PublishError, StoreError};
use crate::fetch::{FetchSource, SourceDescriptor};
use crate::publish::Publisher;
use crate::run::PublishedRecord;
use crate::store::ArticleStore;

/// Installs a `tracing` subscriber routed to the test harness's captured
/// output. Safe to call from every test; only the first call installs.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds a test article at a given age relative to `now`.
#[must_use]
pub fn sample_article(
    url: &str,
    title: &str,
    summary: &str,
    age_hours: i64,
    source: &str,
    now: DateTime<Utc>,
) -> Article {
    Article::new(
        url,
        title,
        summary,
        now - ChronoDuration::hours(age_hours),
        source,
        "press",
    )
}

/// A fetch collaborator with scripted per-source results.
#[derive(Default)]
pub struct MockFetcher {
    results: HashMap<String, Result<Vec<Article>, FetchError>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Creates an empty fetcher; unscripted sources return no articles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful branch for a source name.
    #[must_use]
    pub fn with_articles(mut self, source: impl Into<String>, articles: Vec<Article>) -> Self {
        self.results.insert(source.into(), Ok(articles));
        self
    }

    /// Scripts a failing branch for a source name.
    #[must_use]
    pub fn with_error(mut self, source: impl Into<String>, error: FetchError) -> Self {
        self.results.insert(source.into(), Err(error));
        self
    }

    /// Adds an artificial delay before a source responds.
    #[must_use]
    pub fn with_delay(mut self, source: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(source.into(), delay);
        self
    }

    /// Source names fetched, in completion order.
    #[must_use]
    pub fn fetched_sources(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Total fetch calls across all sources.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl FetchSource for MockFetcher {
    async fn fetch(
        &self,
        source: &SourceDescriptor,
        _window_hours: u32,
    ) -> Result<Vec<Article>, FetchError> {
        if let Some(delay) = self.delays.get(&source.name) {
            tokio::time::sleep(*delay).await;
        }
        self.calls.lock().push(source.name.clone());
        match self.results.get(&source.name) {
            Some(Ok(articles)) => Ok(articles.clone()),
            Some(Err(err)) => Err(err.clone()),
            None => Ok(Vec::new()),
        }
    }
}

/// A draft generator returning deterministic text, optionally failing for
/// one platform.
#[derive(Default)]
pub struct MockDrafter {
    fail_on: Option<Platform>,
    calls: Mutex<Vec<Platform>>,
}

impl MockDrafter {
    /// Creates a drafter that succeeds for every platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes generation fail for the given platform.
    #[must_use]
    pub fn failing_on(mut self, platform: Platform) -> Self {
        self.fail_on = Some(platform);
        self
    }

    /// Platforms drafted so far.
    #[must_use]
    pub fn drafted_platforms(&self) -> Vec<Platform> {
        self.calls.lock().clone()
    }

    /// Total generate calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl DraftGenerator for MockDrafter {
    async fn generate(
        &self,
        article: &Article,
        platform: Platform,
        _style: &StyleConfig,
    ) -> Result<String, GenerationError> {
        self.calls.lock().push(platform);
        if self.fail_on == Some(platform) {
            return Err(GenerationError::new(platform, "scripted failure"));
        }
        Ok(format!("[{platform}] {} {}", article.title, article.url))
    }
}

/// An article store whose operations fail with an IO error, for exercising
/// store-failure paths.
#[derive(Debug, Default)]
pub struct FailingArticleStore {
    fail_reads: bool,
}

impl FailingArticleStore {
    /// Fails every operation.
    #[must_use]
    pub fn new() -> Self {
        Self { fail_reads: true }
    }

    /// Reads succeed (reporting nothing published); writes fail.
    #[must_use]
    pub fn failing_on_write() -> Self {
        Self { fail_reads: false }
    }

    fn disk_error() -> StoreError {
        StoreError::Io(std::io::Error::other("disk failure"))
    }
}

#[async_trait]
impl ArticleStore for FailingArticleStore {
    async fn is_published(&self, _id: &ArticleId) -> Result<bool, StoreError> {
        if self.fail_reads {
            return Err(Self::disk_error());
        }
        Ok(false)
    }

    async fn record_published(&self, _record: PublishedRecord) -> Result<bool, StoreError> {
        Err(Self::disk_error())
    }

    async fn get(&self, _id: &ArticleId) -> Result<Option<PublishedRecord>, StoreError> {
        if self.fail_reads {
            return Err(Self::disk_error());
        }
        Ok(None)
    }
}

/// A publisher with scripted per-platform outcomes and attempt counting.
///
/// Unscripted platforms (or platforms whose script ran dry) succeed with a
/// synthetic post URL.
#[derive(Default)]
pub struct MockPublisher {
    scripts: Mutex<HashMap<Platform, VecDeque<Result<String, PublishError>>>>,
    attempts: Mutex<HashMap<Platform, usize>>,
}

impl MockPublisher {
    /// Creates a publisher that succeeds everywhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next outcomes for a platform, consumed in order.
    #[must_use]
    pub fn script(self, platform: Platform, outcomes: Vec<Result<String, PublishError>>) -> Self {
        self.scripts.lock().insert(platform, outcomes.into());
        self
    }

    /// Number of publish attempts made for a platform.
    #[must_use]
    pub fn attempts(&self, platform: Platform) -> usize {
        self.attempts.lock().get(&platform).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, platform: Platform, _text: &str) -> Result<String, PublishError> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(platform).or_insert(0);
            *count += 1;
            *count
        };
        if let Some(outcome) = self
            .scripts
            .lock()
            .get_mut(&platform)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }
        Ok(format!("https://{platform}.example/post/{attempt}"))
    }
}
