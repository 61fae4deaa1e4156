//! Run state: the unit of durability for one pipeline execution.
//!
//! A run's phase only moves forward; `Failed` is reachable from any
//! non-terminal phase and `Rejected` only from `AwaitingApproval`. Once a run
//! is terminal its state never changes again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::article::{Article, ArticleId};
use crate::draft::Platform;

/// The stage a run is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Fan-out fetch across sources.
    Fetching,
    /// Dedup, filter, score, select.
    Curating,
    /// Per-platform draft generation.
    Drafting,
    /// Suspended, waiting for a human decision.
    AwaitingApproval,
    /// Publishing approved drafts.
    Publishing,
    /// Terminal: published, or nothing eligible to post.
    Completed,
    /// Terminal: human rejected the drafts; no publish.
    Rejected,
    /// Terminal: a structured failure ended the run.
    Failed,
}

impl RunPhase {
    /// Returns true for `Completed`, `Rejected`, and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Failed)
    }

    /// Returns true if `next` is a legal transition from this phase.
    #[must_use]
    pub fn can_advance_to(&self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Failed {
            return true;
        }
        matches!(
            (self, next),
            (Self::Fetching, Self::Curating)
                | (Self::Curating, Self::Drafting)
                // "Nothing to post today" completes without drafting.
                | (Self::Curating, Self::Completed)
                | (Self::Drafting, Self::AwaitingApproval)
                | (Self::AwaitingApproval, Self::Publishing)
                | (Self::AwaitingApproval, Self::Rejected)
                | (Self::Publishing, Self::Completed)
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetching => write!(f, "fetching"),
            Self::Curating => write!(f, "curating"),
            Self::Drafting => write!(f, "drafting"),
            Self::AwaitingApproval => write!(f, "awaiting_approval"),
            Self::Publishing => write!(f, "publishing"),
            Self::Completed => write!(f, "completed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A human decision on a suspended run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Publish the drafts.
    Approved,
    /// Do not publish; the article stays eligible for a future run.
    Rejected,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Structured cause carried by a `Failed` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    /// The fetch stage itself failed (not a per-source branch error).
    Fetch {
        /// The source involved, if any.
        source: String,
        /// Human-readable detail.
        message: String,
    },
    /// Draft generation failed for a configured platform.
    Generation {
        /// The platform whose draft failed.
        platform: Platform,
        /// Human-readable detail.
        message: String,
    },
    /// A required platform could not be published to.
    Publish {
        /// The platform that failed.
        platform: Platform,
        /// Whether the final error was transient (retries exhausted).
        transient: bool,
        /// Human-readable detail.
        message: String,
        /// Platforms that had already succeeded; never rolled back.
        published: BTreeMap<Platform, String>,
    },
    /// A durable store could not be read or written.
    Store {
        /// Human-readable detail.
        message: String,
    },
}

/// Error raised on an illegal phase transition.
#[derive(Debug, Clone, Error)]
#[error("invalid phase transition {from} -> {to} for run '{run_id}'")]
pub struct StateTransitionError {
    /// The run id.
    pub run_id: String,
    /// The current phase.
    pub from: RunPhase,
    /// The rejected target phase.
    pub to: RunPhase,
}

/// Durable state of one pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Opaque, caller-chosen, globally unique run identifier.
    pub run_id: String,
    /// Current phase.
    pub phase: RunPhase,
    /// The article selected by the curator, once known.
    pub winner: Option<Article>,
    /// Per-platform draft text, populated during `Drafting`.
    pub drafts: BTreeMap<Platform, String>,
    /// The accepted decision, if any. `None` while awaiting approval.
    pub decision: Option<Decision>,
    /// Structured cause when `phase == Failed`.
    pub failure: Option<FailureCause>,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// When the run state last changed.
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    /// Creates a fresh run at the `Fetching` phase.
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            phase: RunPhase::Fetching,
            winner: None,
            drafts: BTreeMap::new(),
            decision: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advances to `next`, rejecting regressions and transitions out of a
    /// terminal phase.
    pub fn advance(&mut self, next: RunPhase) -> Result<(), StateTransitionError> {
        if !self.phase.can_advance_to(next) {
            return Err(StateTransitionError {
                run_id: self.run_id.clone(),
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves the run to `Failed` with the given cause. No-op when the run is
    /// already terminal.
    pub fn fail(&mut self, cause: FailureCause) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = RunPhase::Failed;
        self.failure = Some(cause);
        self.updated_at = Utc::now();
    }

    /// Returns true when the run can no longer change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

/// Record of a successfully published article. Created exactly once per
/// article; its id is the single source of truth for "already posted."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedRecord {
    /// Stable article id.
    pub article_id: ArticleId,
    /// Canonical article URL.
    pub article_url: String,
    /// Article headline.
    pub title: String,
    /// When the posts went out.
    pub posted_at: DateTime<Utc>,
    /// URL of the created post per platform.
    pub platform_urls: BTreeMap<Platform, String>,
    /// The draft text that was published, per platform.
    pub drafts: BTreeMap<Platform, String>,
    /// Name of the source the article came from.
    pub source_name: String,
}

/// Convenience run id for one calendar day, e.g. `news-20260829`.
#[must_use]
pub fn daily_run_id(now: DateTime<Utc>) -> String {
    format!("news-{}", now.format("%Y%m%d"))
}

/// Globally unique run id for ad-hoc runs.
#[must_use]
pub fn unique_run_id() -> String {
    format!("news-{}", Uuid::new_v4())
}
