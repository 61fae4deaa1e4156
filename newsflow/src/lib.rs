//! # Newsflow
//!
//! The orchestration core of a daily news curation and publishing pipeline:
//!
//! - **Fan-out fetch**: concurrent per-source fetches with per-branch
//!   timeouts; one bad feed never spoils the rest
//! - **Deterministic curation**: dedup by canonical URL, duplicate
//!   prevention against the published-article store, keyword filtering,
//!   and a reproducible scoring/ranking pass
//! - **Durable approval gate**: runs suspend at `AwaitingApproval` as
//!   persisted state; a separate process invocation resumes them, and at
//!   most one decision is ever accepted per run
//! - **Retrying publish**: transient failures back off exponentially with
//!   jitter, permanent failures abort immediately
//!
//! RSS parsing, draft text generation, and platform HTTP clients live
//! behind the [`fetch::FetchSource`], [`draft::DraftGenerator`], and
//! [`publish::Publisher`] traits.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use newsflow::prelude::*;
//!
//! let orchestrator = Orchestrator::new(
//!     config, fetcher, drafter, publisher, articles, checkpoints,
//! );
//!
//! // Morning cron: drive a run to its suspension point.
//! let outcome = orchestrator.start(&daily_run_id(Utc::now())).await?;
//!
//! // Later, after human review:
//! let outcome = orchestrator.resume("news-20260829", Decision::Approved).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

pub mod approval;
pub mod article;
pub mod config;
pub mod curator;
pub mod draft;
pub mod errors;
pub mod fetch;
pub mod pipeline;
pub mod publish;
pub mod run;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::approval::{render_preview, ApprovalGate};
    pub use crate::article::{canonicalize_url, Article, ArticleId, CandidateSet};
    pub use crate::config::{PipelineConfig, PlatformConfig};
    pub use crate::curator::{Curator, CuratorConfig, ScoredArticle};
    pub use crate::draft::{DraftGenerator, Platform, StyleConfig, TemplateDrafter};
    pub use crate::errors::{
        FetchError, GenerationError, PipelineError, PublishError, ResumeError, StoreError,
    };
    pub use crate::fetch::{fetch_all, FetchOutcome, FetchSource, SourceDescriptor};
    pub use crate::pipeline::{Orchestrator, RunOutcome};
    pub use crate::publish::{publish_with_retry, Publisher, RetryPolicy};
    pub use crate::run::{
        daily_run_id, unique_run_id, Decision, FailureCause, PublishedRecord, RunPhase, RunState,
    };
    pub use crate::store::{
        ArticleStore, CheckpointStore, FileArticleStore, FileCheckpointStore, MemoryArticleStore,
        MemoryCheckpointStore,
    };
}
