//! Human-approval gate: the pause/resume state machine over the checkpoint
//! store.
//!
//! Suspension is a persisted-state return, not a blocking wait: the process
//! may exit entirely between suspension and resume, and a separate process
//! invocation performs the resume. At most one decision is ever accepted per
//! run; concurrent resume attempts race on the store's keyed transaction and
//! exactly one wins.

use std::sync::Arc;

use crate::errors::{PipelineError, ResumeError};
use crate::run::{Decision, RunPhase, RunState};
use crate::store::{CheckpointStore, UpdateError};

/// Pause/resume state machine built on a [`CheckpointStore`].
#[derive(Clone)]
pub struct ApprovalGate {
    checkpoints: Arc<dyn CheckpointStore>,
}

impl ApprovalGate {
    /// Creates a gate over the given checkpoint store.
    #[must_use]
    pub fn new(checkpoints: Arc<dyn CheckpointStore>) -> Self {
        Self { checkpoints }
    }

    /// Suspends a drafted run: advances it to `AwaitingApproval` and
    /// persists it. Control returns to the caller; the run waits
    /// indefinitely for a decision.
    pub async fn suspend(&self, run: &mut RunState) -> Result<(), PipelineError> {
        run.advance(RunPhase::AwaitingApproval)?;
        self.checkpoints.save_run(run).await?;
        tracing::info!(run_id = %run.run_id, "run suspended for approval");
        Ok(())
    }

    /// Applies a decision to a suspended run.
    ///
    /// Fails with `RunNotFound` for an unknown id and `InvalidState` when
    /// the run is not at `AwaitingApproval` (already decided, or it never
    /// got that far). On success the run is atomically advanced to
    /// `Publishing` (approved) or `Rejected` (rejected) and persisted.
    pub async fn resume(
        &self,
        run_id: &str,
        decision: Decision,
    ) -> Result<RunState, PipelineError> {
        let result = self
            .checkpoints
            .update_run(
                run_id,
                Box::new(move |run| {
                    if run.phase != RunPhase::AwaitingApproval {
                        return Err(ResumeError::InvalidState {
                            run_id: run.run_id.clone(),
                            phase: run.phase,
                        });
                    }
                    run.decision = Some(decision);
                    let next = match decision {
                        Decision::Approved => RunPhase::Publishing,
                        Decision::Rejected => RunPhase::Rejected,
                    };
                    run.advance(next).map_err(|_| ResumeError::InvalidState {
                        run_id: run.run_id.clone(),
                        phase: run.phase,
                    })
                }),
            )
            .await;

        match result {
            Ok(run) => {
                tracing::info!(run_id, decision = %decision, "decision accepted");
                Ok(run)
            }
            Err(UpdateError::Rejected(err)) => Err(PipelineError::Resume(err)),
            Err(UpdateError::Store(err)) => Err(PipelineError::Store(err)),
        }
    }
}

/// Renders a human-readable review block for a suspended run.
#[must_use]
pub fn render_preview(run: &RunState) -> String {
    let mut out = String::new();
    out.push_str("=== POST FOR APPROVAL ===\n");
    if let Some(winner) = &run.winner {
        out.push_str(&format!("Title:  {}\n", winner.title));
        out.push_str(&format!("URL:    {}\n", winner.url));
        out.push_str(&format!("Source: {}\n", winner.source_name));
    }
    for (platform, draft) in &run.drafts {
        out.push_str(&format!("\n--- {platform} ---\n{draft}\n"));
    }
    out.push_str(&format!(
        "\nRun id: {} (approve or reject to continue)\n",
        run.run_id
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::Article;
    use crate::draft::Platform;
    use crate::store::MemoryCheckpointStore;
    use chrono::Utc;

    async fn suspended_gate() -> (ApprovalGate, String) {
        let store = Arc::new(MemoryCheckpointStore::new());
        let gate = ApprovalGate::new(store);

        let mut run = RunState::new("r1");
        run.advance(RunPhase::Curating).unwrap();
        run.advance(RunPhase::Drafting).unwrap();
        run.winner = Some(Article::new(
            "https://ex.com/a",
            "AI headline",
            "summary",
            Utc::now(),
            "ArXiv",
            "research",
        ));
        run.drafts
            .insert(Platform::LinkedIn, "linkedin draft".to_string());
        gate.suspend(&mut run).await.unwrap();
        (gate, run.run_id)
    }

    #[tokio::test]
    async fn test_approve_advances_to_publishing() {
        let (gate, run_id) = suspended_gate().await;
        let run = gate.resume(&run_id, Decision::Approved).await.unwrap();
        assert_eq!(run.phase, RunPhase::Publishing);
        assert_eq!(run.decision, Some(Decision::Approved));
    }

    #[tokio::test]
    async fn test_reject_is_terminal() {
        let (gate, run_id) = suspended_gate().await;
        let run = gate.resume(&run_id, Decision::Rejected).await.unwrap();
        assert_eq!(run.phase, RunPhase::Rejected);
        assert!(run.is_terminal());
    }

    #[tokio::test]
    async fn test_second_decision_is_invalid_state() {
        let (gate, run_id) = suspended_gate().await;
        gate.resume(&run_id, Decision::Approved).await.unwrap();

        let second = gate.resume(&run_id, Decision::Rejected).await;
        assert!(matches!(
            second,
            Err(PipelineError::Resume(ResumeError::InvalidState { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unknown_run_is_run_not_found() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let gate = ApprovalGate::new(store);
        let result = gate.resume("missing", Decision::Approved).await;
        assert!(matches!(
            result,
            Err(PipelineError::Resume(ResumeError::RunNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_resume_before_suspension_is_invalid_state() {
        let store = Arc::new(MemoryCheckpointStore::new());
        store.save_run(&RunState::new("early")).await.unwrap();
        let gate = ApprovalGate::new(store);

        let result = gate.resume("early", Decision::Approved).await;
        assert!(matches!(
            result,
            Err(PipelineError::Resume(ResumeError::InvalidState { .. }))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_decisions_accept_exactly_one() {
        let (gate, run_id) = suspended_gate().await;
        let approve = gate.resume(&run_id, Decision::Approved);
        let reject = gate.resume(&run_id, Decision::Rejected);

        let (a, r) = tokio::join!(approve, reject);
        let accepted = [a.is_ok(), r.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn test_preview_lists_article_and_drafts() {
        let (gate, run_id) = suspended_gate().await;
        let run = gate.checkpoints.load_run(&run_id).await.unwrap().unwrap();
        let preview = render_preview(&run);
        assert!(preview.contains("AI headline"));
        assert!(preview.contains("linkedin draft"));
        assert!(preview.contains(&run_id));
    }
}
