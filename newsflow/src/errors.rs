//! Error taxonomy for the newsflow pipeline.
//!
//! Per-source fetch errors are absorbed at the fan-out stage boundary; every
//! other error propagates up to the run's `Failed` phase with the structured
//! cause retained for inspection.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::draft::Platform;
use crate::run::{RunPhase, StateTransitionError};

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A durable store could not be read or written.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Draft generation failed for a configured platform.
    #[error("{0}")]
    Generation(#[from] GenerationError),

    /// A required platform could not be published to.
    #[error("{0}")]
    Publish(PublishFailure),

    /// A resume call was invalid for the target run.
    #[error("{0}")]
    Resume(#[from] ResumeError),

    /// A run with this id already exists.
    #[error("run already exists: {run_id}")]
    DuplicateRun {
        /// The conflicting run id.
        run_id: String,
    },

    /// A run attempted an invalid phase transition.
    #[error("{0}")]
    State(#[from] StateTransitionError),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error from one fan-out branch. Never fatal to the stage: the branch's
/// articles are simply absent from the candidate set.
// Not derived via thiserror: a field named `source` would be treated as the
// error source, but here it is the feed source's name (a String).
#[derive(Debug, Clone)]
pub struct FetchError {
    /// The source that failed.
    pub source: String,
    /// How the branch failed.
    pub kind: FetchErrorKind,
    /// Human-readable detail.
    pub message: String,
}

/// Classification of a fan-out branch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The feed could not be fetched or parsed.
    Feed,
    /// The per-branch timeout expired.
    Timeout,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetch failed for source '{}': {}",
            self.source, self.message
        )
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Creates a feed-level fetch error.
    #[must_use]
    pub fn feed(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: FetchErrorKind::Feed,
            message: message.into(),
        }
    }

    /// Creates a timeout error for a branch that did not finish in time.
    #[must_use]
    pub fn timeout(source: impl Into<String>, limit: Duration) -> Self {
        Self {
            source: source.into(),
            kind: FetchErrorKind::Timeout,
            message: format!("timed out after {}ms", limit.as_millis()),
        }
    }

    /// Returns true if the branch timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == FetchErrorKind::Timeout
    }
}

/// Draft generation failure. Fatal to the run: drafting is a single attempt
/// per platform at this layer.
#[derive(Debug, Clone, Error)]
#[error("draft generation failed for {platform}: {message}")]
pub struct GenerationError {
    /// The platform whose draft could not be generated.
    pub platform: Platform,
    /// Human-readable detail.
    pub message: String,
}

impl GenerationError {
    /// Creates a new generation error.
    #[must_use]
    pub fn new(platform: Platform, message: impl Into<String>) -> Self {
        Self {
            platform,
            message: message.into(),
        }
    }
}

/// External publish failure, classified for retry handling.
#[derive(Debug, Clone, Error)]
pub enum PublishError {
    /// Retryable: network timeouts, rate limits, server-side errors.
    #[error("transient publish error: {message}")]
    Transient {
        /// Human-readable detail.
        message: String,
    },

    /// Not retryable: auth failures, malformed payloads.
    #[error("permanent publish error: {message}")]
    Permanent {
        /// Human-readable detail.
        message: String,
    },
}

impl PublishError {
    /// Creates a transient (retryable) error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Creates a permanent (non-retryable) error.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    /// Classifies an HTTP status code. 429 and the 5xx family are
    /// transient; every other 4xx is permanent.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = format!("status {status}: {}", message.into());
        if status == 429 || (500..600).contains(&status) {
            Self::Transient { message }
        } else {
            Self::Permanent { message }
        }
    }

    /// Returns true if the error should be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// A platform-level publish failure surfaced by the orchestrator, carrying
/// the platforms that had already succeeded. Partial publications are never
/// rolled back.
#[derive(Debug, Clone)]
pub struct PublishFailure {
    /// The platform that failed.
    pub platform: Platform,
    /// The final error after retry handling.
    pub error: PublishError,
    /// Platform URLs that were published before the failure.
    pub published: BTreeMap<Platform, String>,
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "publish failed for {}: {}", self.platform, self.error)?;
        if !self.published.is_empty() {
            let done: Vec<String> = self.published.keys().map(ToString::to_string).collect();
            write!(f, " (already published: {})", done.join(", "))?;
        }
        Ok(())
    }
}

/// Durable-store failure. Fatal: durability can no longer be guaranteed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying IO failure.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted record could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Resume-time error reported to the caller. Never mutates run state.
#[derive(Debug, Clone, Error)]
pub enum ResumeError {
    /// No run exists for the supplied id.
    #[error("run not found: {run_id}")]
    RunNotFound {
        /// The unknown run id.
        run_id: String,
    },

    /// The run is not awaiting approval: already decided, or it never
    /// reached that phase. Decisions are accepted exactly once.
    #[error("run '{run_id}' is not awaiting approval (phase: {phase})")]
    InvalidState {
        /// The run id.
        run_id: String,
        /// The phase the run was actually in.
        phase: RunPhase,
    },
}
