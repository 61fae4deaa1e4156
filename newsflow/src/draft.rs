//! Draft generation boundary.
//!
//! The orchestrator treats generation as an opaque collaborator: one attempt
//! per platform per run, failure fatal to the run. Retries, if any, belong to
//! the generator's own boundary. `TemplateDrafter` is a deterministic default
//! implementation for runs that do not wire a model-backed generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::article::Article;
use crate::errors::GenerationError;

/// A publishing target platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// LinkedIn feed post.
    LinkedIn,
    /// Twitter/X post.
    Twitter,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkedIn => write!(f, "linkedin"),
            Self::Twitter => write!(f, "twitter"),
        }
    }
}

/// Style knobs for draft generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Hashtags always included on long-form posts.
    pub core_hashtags: Vec<String>,
    /// Upper bound on hashtags per post.
    pub max_hashtags: usize,
    /// Summary excerpt length for long-form posts, in characters.
    pub summary_chars: usize,
    /// Hard character budget for Twitter.
    pub twitter_limit: usize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            core_hashtags: vec![
                "#ArtificialIntelligence".to_string(),
                "#MachineLearning".to_string(),
                "#Technology".to_string(),
            ],
            max_hashtags: 5,
            summary_chars: 300,
            twitter_limit: 280,
        }
    }
}

/// Contract for platform-specific draft generation.
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    /// Generates draft text for one article on one platform.
    async fn generate(
        &self,
        article: &Article,
        platform: Platform,
        style: &StyleConfig,
    ) -> Result<String, GenerationError>;
}

/// Topic keywords that contribute extra hashtags when present in a title.
const TOPIC_HASHTAGS: &[(&[&str], &[&str])] = &[
    (
        &["gpt", "llm", "language model"],
        &["#LargeLanguageModels", "#NLP"],
    ),
    (&["vision", "image", "visual"], &["#ComputerVision"]),
    (&["robot", "autonomous"], &["#Robotics"]),
    (
        &["generative", "diffusion", "generation"],
        &["#GenerativeAI"],
    ),
];

/// Deterministic template-based drafter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateDrafter;

impl TemplateDrafter {
    /// Creates a new template drafter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn hashtags(article: &Article, style: &StyleConfig) -> Vec<String> {
        let title = article.title.to_lowercase();
        let mut tags: Vec<String> = style.core_hashtags.clone();
        for (triggers, extra) in TOPIC_HASHTAGS {
            if triggers.iter().any(|t| title.contains(t)) {
                for tag in *extra {
                    tags.push((*tag).to_string());
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        tags.retain(|tag| seen.insert(tag.clone()));
        tags.truncate(style.max_hashtags);
        tags
    }

    fn linkedin(article: &Article, style: &StyleConfig) -> String {
        let excerpt = truncate_chars(&article.summary, style.summary_chars);
        let tags = Self::hashtags(article, style).join(" ");
        format!(
            "{}\n\n{}\n\nWhat are your thoughts on this development?\n\n{}\n\nRead more: {}\nSource: {}",
            article.title, excerpt, tags, article.url, article.source_name
        )
    }

    fn twitter(article: &Article, style: &StyleConfig) -> String {
        let tags: Vec<String> = Self::hashtags(article, style).into_iter().take(2).collect();
        let mut suffix = format!(" {} {}", article.url, tags.join(" "));
        if suffix.chars().count() >= style.twitter_limit {
            // Tags are the first thing to go; the link stays.
            suffix = format!(" {}", article.url);
        }
        let budget = style
            .twitter_limit
            .saturating_sub(suffix.chars().count());
        let title = truncate_chars(&article.title, budget);
        truncate_chars(&format!("{title}{suffix}"), style.twitter_limit)
    }
}

#[async_trait]
impl DraftGenerator for TemplateDrafter {
    async fn generate(
        &self,
        article: &Article,
        platform: Platform,
        style: &StyleConfig,
    ) -> Result<String, GenerationError> {
        if article.title.trim().is_empty() {
            return Err(GenerationError::new(platform, "article has no title"));
        }
        let text = match platform {
            Platform::LinkedIn => Self::linkedin(article, style),
            Platform::Twitter => Self::twitter(article, style),
        };
        Ok(text)
    }
}

/// Truncates to at most `limit` characters, appending an ellipsis when
/// anything was cut. Safe on multi-byte input.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(1)).collect();
    format!("{kept}\u{2026}")
}
