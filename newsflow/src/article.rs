//! Article identity, URL canonicalization, and candidate sets.
//!
//! An article's identity is its canonical URL: two articles whose URLs differ
//! only by tracking parameters, host casing, or a trailing slash are the same
//! entity and carry the same stable id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Query parameters stripped during canonicalization, in addition to the
/// `utm_*` family.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_cid", "mc_eid", "ref", "ref_src"];

/// Stable identifier for an article, derived from its canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    /// Computes the id for a raw article URL.
    #[must_use]
    pub fn from_url(raw_url: &str) -> Self {
        let canonical = canonicalize_url(raw_url);
        let digest = Sha256::digest(canonical.as_bytes());
        Self(hex::encode(&digest[..16]))
    }

    /// Returns the id as a hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single news article fetched from a source feed. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable identifier derived from the canonical URL.
    pub id: ArticleId,
    /// The canonical form of the article URL.
    pub url: String,
    /// Article headline.
    pub title: String,
    /// Feed-provided summary or description.
    pub summary: String,
    /// When the source published the article.
    pub published_at: DateTime<Utc>,
    /// Human-readable name of the originating source.
    pub source_name: String,
    /// Category of the originating source (e.g., "research", "press").
    pub source_category: String,
}

impl Article {
    /// Creates an article, canonicalizing the URL and deriving the id.
    #[must_use]
    pub fn new(
        raw_url: impl AsRef<str>,
        title: impl Into<String>,
        summary: impl Into<String>,
        published_at: DateTime<Utc>,
        source_name: impl Into<String>,
        source_category: impl Into<String>,
    ) -> Self {
        let url = canonicalize_url(raw_url.as_ref());
        Self {
            id: ArticleId::from_url(raw_url.as_ref()),
            url,
            title: title.into(),
            summary: summary.into(),
            published_at,
            source_name: source_name.into(),
            source_category: source_category.into(),
        }
    }
}

/// Canonicalizes an article URL: lowercases scheme and host, strips tracking
/// query parameters, strips the trailing slash from the path.
///
/// Malformed URLs are returned trimmed but otherwise unchanged so that feed
/// junk never aborts a fetch branch.
#[must_use]
pub fn canonicalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    // The url crate lowercases scheme and host on parse.
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    parsed.set_query(None);
    if !kept.is_empty() {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &kept {
            serializer.append_pair(key, value);
        }
        let query = serializer.finish();
        parsed.set_query(Some(&query));
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    parsed.to_string()
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// The union of articles returned by all fan-out branches for one run, in
/// source-then-article order. Transient: exists only within one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    articles: Vec<Article>,
}

impl CandidateSet {
    /// Creates an empty candidate set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one branch's articles, preserving their order.
    pub fn extend(&mut self, articles: Vec<Article>) {
        self.articles.extend(articles);
    }

    /// Appends a single article.
    pub fn push(&mut self, article: Article) {
        self.articles.push(article);
    }

    /// Returns the articles in fan-out order.
    #[must_use]
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Number of candidate articles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Returns true if no branch produced any article.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

impl From<Vec<Article>> for CandidateSet {
    fn from(articles: Vec<Article>) -> Self {
        Self { articles }
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Article;
    type IntoIter = std::slice::Iter<'a, Article>;

    fn into_iter(self) -> Self::IntoIter {
        self.articles.iter()
    }
}
