//! Pipeline orchestration: the run lifecycle from fetch to publish.
//!
//! A run walks `Fetching -> Curating -> Drafting -> AwaitingApproval ->
//! Publishing -> Completed`, suspending durably at the approval gate. Resume
//! happens through a separate entry point and continues from the persisted
//! phase; nothing before the suspension point is re-executed.

#[cfg(test)]
mod integration_tests;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;

use crate::approval::{render_preview, ApprovalGate};
use crate::article::ArticleId;
use crate::config::PipelineConfig;
use crate::curator::Curator;
use crate::draft::{DraftGenerator, Platform};
use crate::errors::{PipelineError, PublishFailure};
use crate::fetch::{fetch_all, FetchSource};
use crate::publish::{publish_with_retry, Publisher};
use crate::run::{Decision, FailureCause, PublishedRecord, RunPhase, RunState};
use crate::store::{ArticleStore, CheckpointStore};

/// Terminal-or-suspended outcome of a pipeline entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// No eligible article today; the run completed without drafts.
    NothingToPost,
    /// The run is suspended, waiting for a human decision.
    AwaitingApproval {
        /// The suspended run's id.
        run_id: String,
        /// Human-readable review block.
        preview: String,
    },
    /// The drafts were rejected; nothing was published.
    Rejected,
    /// All required platforms succeeded and the record was stored.
    Published {
        /// The record inserted into the article store.
        record: PublishedRecord,
        /// Failures on non-required platforms, if any.
        optional_failures: BTreeMap<Platform, String>,
    },
}

/// Sequences fetch, curation, drafting, approval, and publishing for
/// independent runs over shared stores.
pub struct Orchestrator {
    config: PipelineConfig,
    fetcher: Arc<dyn FetchSource>,
    drafter: Arc<dyn DraftGenerator>,
    publisher: Arc<dyn Publisher>,
    articles: Arc<dyn ArticleStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    curator: Curator,
    gate: ApprovalGate,
}

impl Orchestrator {
    /// Wires an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        fetcher: Arc<dyn FetchSource>,
        drafter: Arc<dyn DraftGenerator>,
        publisher: Arc<dyn Publisher>,
        articles: Arc<dyn ArticleStore>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        let curator = Curator::new(config.curator.clone());
        let gate = ApprovalGate::new(Arc::clone(&checkpoints));
        Self {
            config,
            fetcher,
            drafter,
            publisher,
            articles,
            checkpoints,
            curator,
            gate,
        }
    }

    /// Starts a new run and drives it to its suspension point (or a
    /// terminal phase when there is nothing to approve).
    ///
    /// `run_id` is caller-chosen and must be unique; starting an existing id
    /// fails with `DuplicateRun`.
    pub async fn start(&self, run_id: &str) -> Result<RunOutcome, PipelineError> {
        // A suspended run with no drafts would be undecidable, so an empty
        // platform list is rejected before any state is persisted.
        if self.config.platforms.is_empty() {
            return Err(PipelineError::Internal(
                "no publishing platforms configured".to_string(),
            ));
        }
        if self.checkpoints.load_run(run_id).await?.is_some() {
            return Err(PipelineError::DuplicateRun {
                run_id: run_id.to_string(),
            });
        }

        let mut run = RunState::new(run_id);
        self.checkpoints.save_run(&run).await?;
        tracing::info!(
            run_id,
            sources = self.config.sources.len(),
            window_hours = self.config.window_hours,
            "run started"
        );

        // Fetching. Per-source errors are absorbed by the stage; an empty
        // candidate set is not an error.
        let fetched = fetch_all(
            &self.fetcher,
            &self.config.sources,
            self.config.window_hours,
            self.config.fetch_timeout(),
        )
        .await;
        tracing::info!(
            run_id,
            candidates = fetched.candidates.len(),
            source_errors = fetched.errors.len(),
            "fetch stage complete"
        );

        run.advance(RunPhase::Curating)?;
        self.checkpoints.save_run(&run).await?;

        // Exclusion input: membership of every distinct candidate id.
        let published = match self.published_ids(&fetched.candidates).await {
            Ok(ids) => ids,
            Err(err) => {
                self.fail_run(
                    &mut run,
                    FailureCause::Store {
                        message: err.to_string(),
                    },
                )
                .await;
                return Err(err.into());
            }
        };

        let Some(winner) = self
            .curator
            .select(&fetched.candidates, &published, Utc::now())
        else {
            run.advance(RunPhase::Completed)?;
            self.checkpoints.save_run(&run).await?;
            tracing::info!(run_id, "no eligible article today");
            return Ok(RunOutcome::NothingToPost);
        };
        tracing::info!(
            run_id,
            article = %winner.article.id,
            score = winner.total_score,
            "winner selected"
        );

        run.advance(RunPhase::Drafting)?;
        run.winner = Some(winner.article.clone());
        self.checkpoints.save_run(&run).await?;

        // One generation attempt per platform; any failure ends the run.
        for target in &self.config.platforms {
            match self
                .drafter
                .generate(&winner.article, target.platform, &self.config.style)
                .await
            {
                Ok(text) => {
                    run.drafts.insert(target.platform, text);
                }
                Err(err) => {
                    self.fail_run(
                        &mut run,
                        FailureCause::Generation {
                            platform: err.platform,
                            message: err.message.clone(),
                        },
                    )
                    .await;
                    return Err(err.into());
                }
            }
        }

        self.gate.suspend(&mut run).await?;
        Ok(RunOutcome::AwaitingApproval {
            run_id: run.run_id.clone(),
            preview: render_preview(&run),
        })
    }

    /// Resumes a suspended run with a human decision and, on approval,
    /// publishes to every configured platform.
    pub async fn resume(
        &self,
        run_id: &str,
        decision: Decision,
    ) -> Result<RunOutcome, PipelineError> {
        let mut run = self.gate.resume(run_id, decision).await?;

        if run.phase == RunPhase::Rejected {
            tracing::info!(run_id, "run rejected, nothing published");
            return Ok(RunOutcome::Rejected);
        }

        let winner = run.winner.clone().ok_or_else(|| {
            PipelineError::Internal(format!("run '{run_id}' is publishing without a winner"))
        })?;

        let mut platform_urls: BTreeMap<Platform, String> = BTreeMap::new();
        let mut optional_failures: BTreeMap<Platform, String> = BTreeMap::new();

        for target in &self.config.platforms {
            let Some(text) = run.drafts.get(&target.platform).cloned() else {
                return Err(PipelineError::Internal(format!(
                    "run '{run_id}' has no draft for {}",
                    target.platform
                )));
            };
            match publish_with_retry(
                self.publisher.as_ref(),
                target.platform,
                &text,
                &self.config.retry,
            )
            .await
            {
                Ok(url) => {
                    tracing::info!(run_id, platform = %target.platform, %url, "published");
                    platform_urls.insert(target.platform, url);
                }
                Err(err) if target.required => {
                    // Partial publications stay up; the failure records
                    // which platforms did and did not succeed.
                    self.fail_run(
                        &mut run,
                        FailureCause::Publish {
                            platform: target.platform,
                            transient: err.is_transient(),
                            message: err.to_string(),
                            published: platform_urls.clone(),
                        },
                    )
                    .await;
                    return Err(PipelineError::Publish(PublishFailure {
                        platform: target.platform,
                        error: err,
                        published: platform_urls,
                    }));
                }
                Err(err) => {
                    tracing::warn!(
                        run_id,
                        platform = %target.platform,
                        error = %err,
                        "optional platform failed"
                    );
                    optional_failures.insert(target.platform, err.to_string());
                }
            }
        }

        let record = PublishedRecord {
            article_id: winner.id.clone(),
            article_url: winner.url.clone(),
            title: winner.title.clone(),
            posted_at: Utc::now(),
            platform_urls,
            drafts: run.drafts.clone(),
            source_name: winner.source_name.clone(),
        };
        match self.articles.record_published(record.clone()).await {
            Ok(inserted) => {
                if !inserted {
                    // Duplicate insert from a re-resume race: keep the run
                    // converging on Completed rather than erroring.
                    tracing::debug!(run_id, article = %record.article_id, "record already present");
                }
            }
            Err(err) => {
                self.fail_run(
                    &mut run,
                    FailureCause::Store {
                        message: err.to_string(),
                    },
                )
                .await;
                return Err(err.into());
            }
        }

        run.advance(RunPhase::Completed)?;
        self.checkpoints.save_run(&run).await?;
        tracing::info!(run_id, article = %record.article_id, "run completed");

        Ok(RunOutcome::Published {
            record,
            optional_failures,
        })
    }

    /// Loads the persisted state of a run for inspection.
    pub async fn run_state(&self, run_id: &str) -> Result<Option<RunState>, PipelineError> {
        Ok(self.checkpoints.load_run(run_id).await?)
    }

    async fn published_ids(
        &self,
        candidates: &crate::article::CandidateSet,
    ) -> Result<HashSet<ArticleId>, crate::errors::StoreError> {
        let mut distinct: HashSet<ArticleId> = HashSet::new();
        for article in candidates {
            distinct.insert(article.id.clone());
        }
        let mut published = HashSet::new();
        for id in distinct {
            if self.articles.is_published(&id).await? {
                published.insert(id);
            }
        }
        Ok(published)
    }

    /// Persists the failure cause into the run before the error propagates.
    async fn fail_run(&self, run: &mut RunState, cause: FailureCause) {
        tracing::error!(run_id = %run.run_id, ?cause, "run failed");
        run.fail(cause);
        if let Err(err) = self.checkpoints.save_run(run).await {
            tracing::error!(run_id = %run.run_id, error = %err, "failed to persist run failure");
        }
    }
}
