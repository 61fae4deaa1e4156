//! Curation: dedup, exclusion, keyword filtering, scoring, and selection.
//!
//! The curator is a pure function of the candidate set, its configuration,
//! the set of already-published ids, and an explicit evaluation time. Given
//! the same inputs it always produces the same ranking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::article::{Article, ArticleId, CandidateSet};

/// Keyword and credibility configuration for curation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratorConfig {
    /// Keywords that make an article eligible. Case-insensitive substring
    /// match against title + summary; zero matches filters the article out.
    pub keywords: Vec<String>,
    /// Per-source credibility scores, matched as case-insensitive substrings
    /// of the source name. A `BTreeMap` keeps the match order deterministic.
    pub credibility: BTreeMap<String, f64>,
    /// Credibility for sources not in the table.
    pub default_credibility: f64,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        let keywords = [
            "artificial intelligence",
            "ai",
            "machine learning",
            "ml",
            "deep learning",
            "neural network",
            "llm",
            "large language model",
            "generative ai",
            "genai",
            "natural language processing",
            "nlp",
            "computer vision",
            "reinforcement learning",
            "transformer",
            "diffusion model",
            "autonomous",
            "robotics",
            "model training",
            "fine-tuning",
            "prompt engineering",
            "rag",
            "retrieval augmented generation",
            "agent",
            "multimodal",
            "embedding",
            "vector database",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let credibility = [
            ("arxiv", 10.0),
            ("mit technology review", 9.0),
            ("mit tech", 9.0),
            ("nature", 9.0),
            ("science", 9.0),
            ("techcrunch", 7.0),
            ("venturebeat", 7.0),
            ("wired", 7.0),
            ("ai news", 6.0),
        ]
        .iter()
        .map(|(name, score)| ((*name).to_string(), *score))
        .collect();

        Self {
            keywords,
            credibility,
            default_credibility: 5.0,
        }
    }
}

/// An article with its curation scores. Never persisted; only the winner's
/// identity and drafts outlive the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArticle {
    /// The scored article.
    pub article: Article,
    /// Keywords found in title + summary.
    pub matched_keywords: Vec<String>,
    /// 5 points per matched keyword.
    pub relevance_score: f64,
    /// From the per-source credibility table.
    pub credibility_score: f64,
    /// `max(0, 10 - hours_old / 2.4)` at the evaluation time.
    pub recency_score: f64,
    /// Sum of the three component scores.
    pub total_score: f64,
}

/// Deterministic curation over one run's candidate set.
#[derive(Debug, Clone, Default)]
pub struct Curator {
    config: CuratorConfig,
}

impl Curator {
    /// Creates a curator with the given configuration.
    #[must_use]
    pub fn new(config: CuratorConfig) -> Self {
        Self { config }
    }

    /// Access to the active configuration.
    #[must_use]
    pub fn config(&self) -> &CuratorConfig {
        &self.config
    }

    /// Collapses URL-duplicate articles, preferring the instance with the
    /// longest summary; ties keep the first-seen instance. Output preserves
    /// first-seen order.
    #[must_use]
    pub fn dedup(candidates: &CandidateSet) -> Vec<Article> {
        let mut by_url: HashMap<&str, usize> = HashMap::new();
        let mut kept: Vec<Article> = Vec::new();

        for article in candidates {
            match by_url.get(article.url.as_str()) {
                Some(&index) => {
                    if article.summary.len() > kept[index].summary.len() {
                        kept[index] = article.clone();
                    }
                }
                None => {
                    by_url.insert(article.url.as_str(), kept.len());
                    kept.push(article.clone());
                }
            }
        }
        kept
    }

    /// Returns the configured keywords present in the article's title or
    /// summary (case-insensitive substring match).
    #[must_use]
    pub fn matched_keywords(&self, article: &Article) -> Vec<String> {
        let haystack = format!(
            "{} {}",
            article.title.to_lowercase(),
            article.summary.to_lowercase()
        );
        self.config
            .keywords
            .iter()
            .filter(|keyword| haystack.contains(&keyword.to_lowercase()))
            .cloned()
            .collect()
    }

    /// Looks up the credibility score for a source name. The first table
    /// entry contained in the lowercased name wins; unlisted sources get the
    /// default.
    #[must_use]
    pub fn credibility_for(&self, source_name: &str) -> f64 {
        let name = source_name.to_lowercase();
        self.config
            .credibility
            .iter()
            .find(|(key, _)| name.contains(key.as_str()))
            .map_or(self.config.default_credibility, |(_, score)| *score)
    }

    /// Recency component: 10 points at age zero, fading to 0 at 24 hours.
    /// Future-dated articles (bad feed clocks) count as age zero.
    #[must_use]
    pub fn recency_score(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let hours_old = (now - published_at).num_seconds().max(0) as f64 / 3600.0;
        (10.0 - hours_old / 2.4).max(0.0)
    }

    /// Produces the full ranking: dedup, drop already-published ids, drop
    /// keywordless articles, score, and sort by total score (ties by earliest
    /// publication, then dedup order).
    #[must_use]
    pub fn rank(
        &self,
        candidates: &CandidateSet,
        published: &HashSet<ArticleId>,
        now: DateTime<Utc>,
    ) -> Vec<ScoredArticle> {
        let mut scored: Vec<ScoredArticle> = Self::dedup(candidates)
            .into_iter()
            .filter(|article| !published.contains(&article.id))
            .filter_map(|article| {
                let matched = self.matched_keywords(&article);
                if matched.is_empty() {
                    return None;
                }
                let relevance = 5.0 * matched.len() as f64;
                let credibility = self.credibility_for(&article.source_name);
                let recency = Self::recency_score(article.published_at, now);
                Some(ScoredArticle {
                    relevance_score: relevance,
                    credibility_score: credibility,
                    recency_score: recency,
                    total_score: relevance + credibility + recency,
                    matched_keywords: matched,
                    article,
                })
            })
            .collect();

        // Stable sort keeps dedup order for full ties.
        scored.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.article.published_at.cmp(&b.article.published_at))
        });
        scored
    }

    /// The single winner, or `None` when no article is eligible today.
    #[must_use]
    pub fn select(
        &self,
        candidates: &CandidateSet,
        published: &HashSet<ArticleId>,
        now: DateTime<Utc>,
    ) -> Option<ScoredArticle> {
        self.rank(candidates, published, now).into_iter().next()
    }
}
