//! End-to-end lifecycle tests over mock collaborators.

use std::sync::Arc;

use chrono::Utc;
use pretty_assertions::assert_eq;

use crate::config::{PipelineConfig, PlatformConfig};
use crate::draft::Platform;
use crate::errors::{PipelineError, PublishError, ResumeError};
use crate::fetch::SourceDescriptor;
use crate::pipeline::{Orchestrator, RunOutcome};
use crate::run::{Decision, FailureCause, RunPhase};
use crate::store::{
    ArticleStore, CheckpointStore, FileArticleStore, FileCheckpointStore, MemoryArticleStore,
    MemoryCheckpointStore,
};
use crate::testing::{
    init_test_logging, sample_article, FailingArticleStore, MockDrafter, MockFetcher,
    MockPublisher,
};

fn test_config() -> PipelineConfig {
    PipelineConfig {
        sources: vec![
            SourceDescriptor::new("ArXiv AI", "https://arxiv.example/rss", "research"),
            SourceDescriptor::new("TechCrunch AI", "https://tc.example/rss", "press"),
        ],
        retry: crate::publish::RetryPolicy::immediate(5),
        ..PipelineConfig::default()
    }
}

fn stocked_fetcher() -> MockFetcher {
    let now = Utc::now();
    MockFetcher::new()
        .with_articles(
            "ArXiv AI",
            vec![sample_article(
                "https://arxiv.example/paper/1",
                "New LLM training method",
                "A machine learning breakthrough",
                1,
                "ArXiv AI",
                now,
            )],
        )
        .with_articles(
            "TechCrunch AI",
            vec![sample_article(
                "https://tc.example/story/1",
                "Startup ships AI gadget",
                "ai hardware",
                3,
                "TechCrunch AI",
                now,
            )],
        )
}

struct Harness {
    orchestrator: Orchestrator,
    fetcher: Arc<MockFetcher>,
    drafter: Arc<MockDrafter>,
    publisher: Arc<MockPublisher>,
    articles: Arc<MemoryArticleStore>,
    checkpoints: Arc<MemoryCheckpointStore>,
}

fn harness(config: PipelineConfig, fetcher: MockFetcher, publisher: MockPublisher) -> Harness {
    init_test_logging();
    let fetcher = Arc::new(fetcher);
    let drafter = Arc::new(MockDrafter::new());
    let publisher = Arc::new(publisher);
    let articles = Arc::new(MemoryArticleStore::new());
    let checkpoints = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = Orchestrator::new(
        config,
        Arc::clone(&fetcher) as Arc<dyn crate::fetch::FetchSource>,
        Arc::clone(&drafter) as Arc<dyn crate::draft::DraftGenerator>,
        Arc::clone(&publisher) as Arc<dyn crate::publish::Publisher>,
        Arc::clone(&articles) as Arc<dyn ArticleStore>,
        Arc::clone(&checkpoints) as Arc<dyn CheckpointStore>,
    );
    Harness {
        orchestrator,
        fetcher,
        drafter,
        publisher,
        articles,
        checkpoints,
    }
}

#[tokio::test]
async fn test_full_run_approve_and_publish() {
    let h = harness(test_config(), stocked_fetcher(), MockPublisher::new());

    let outcome = h.orchestrator.start("run-1").await.unwrap();
    let RunOutcome::AwaitingApproval { run_id, preview } = outcome else {
        panic!("expected suspension, got {outcome:?}");
    };
    assert_eq!(run_id, "run-1");
    assert!(preview.contains("New LLM training method"));

    // Suspended state is durable and well-formed.
    let suspended = h.checkpoints.load_run("run-1").await.unwrap().unwrap();
    assert_eq!(suspended.phase, RunPhase::AwaitingApproval);
    assert!(suspended.decision.is_none());
    assert_eq!(suspended.drafts.len(), 2);

    let outcome = h
        .orchestrator
        .resume("run-1", Decision::Approved)
        .await
        .unwrap();
    let RunOutcome::Published {
        record,
        optional_failures,
    } = outcome
    else {
        panic!("expected publication");
    };
    assert!(optional_failures.is_empty());
    assert_eq!(record.platform_urls.len(), 2);
    assert_eq!(record.article_url, "https://arxiv.example/paper/1");

    // The winner is recorded for duplicate prevention.
    assert!(h.articles.is_published(&record.article_id).await.unwrap());

    let done = h.checkpoints.load_run("run-1").await.unwrap().unwrap();
    assert_eq!(done.phase, RunPhase::Completed);
    assert_eq!(done.decision, Some(Decision::Approved));
}

#[tokio::test]
async fn test_duplicate_run_id_is_rejected() {
    let h = harness(test_config(), stocked_fetcher(), MockPublisher::new());
    h.orchestrator.start("run-1").await.unwrap();
    let second = h.orchestrator.start("run-1").await;
    assert!(matches!(second, Err(PipelineError::DuplicateRun { .. })));
}

#[tokio::test]
async fn test_empty_feeds_complete_with_nothing_to_post() {
    let h = harness(test_config(), MockFetcher::new(), MockPublisher::new());

    let outcome = h.orchestrator.start("run-1").await.unwrap();
    assert_eq!(outcome, RunOutcome::NothingToPost);

    let run = h.checkpoints.load_run("run-1").await.unwrap().unwrap();
    assert_eq!(run.phase, RunPhase::Completed);
    assert!(run.drafts.is_empty());
    assert_eq!(h.drafter.call_count(), 0);
    assert_eq!(h.publisher.attempts(Platform::LinkedIn), 0);
}

#[tokio::test]
async fn test_already_published_article_is_excluded() {
    let h = harness(test_config(), stocked_fetcher(), MockPublisher::new());

    // First run publishes the ArXiv article.
    h.orchestrator.start("run-1").await.unwrap();
    h.orchestrator
        .resume("run-1", Decision::Approved)
        .await
        .unwrap();

    // Second run sees the same candidates; the published one cannot win.
    let outcome = h.orchestrator.start("run-2").await.unwrap();
    let RunOutcome::AwaitingApproval { .. } = &outcome else {
        panic!("expected the runner-up to win");
    };
    let run = h.checkpoints.load_run("run-2").await.unwrap().unwrap();
    assert_eq!(
        run.winner.unwrap().url,
        "https://tc.example/story/1"
    );
}

#[tokio::test]
async fn test_generation_error_fails_the_run() {
    let fetcher = Arc::new(stocked_fetcher());
    let drafter = Arc::new(MockDrafter::new().failing_on(Platform::Twitter));
    let publisher = Arc::new(MockPublisher::new());
    let articles = Arc::new(MemoryArticleStore::new());
    let checkpoints = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = Orchestrator::new(
        test_config(),
        fetcher,
        drafter,
        Arc::clone(&publisher) as Arc<dyn crate::publish::Publisher>,
        Arc::clone(&articles) as Arc<dyn ArticleStore>,
        Arc::clone(&checkpoints) as Arc<dyn CheckpointStore>,
    );

    let result = orchestrator.start("run-1").await;
    assert!(matches!(result, Err(PipelineError::Generation(_))));

    let run = checkpoints.load_run("run-1").await.unwrap().unwrap();
    assert_eq!(run.phase, RunPhase::Failed);
    assert!(matches!(
        run.failure,
        Some(FailureCause::Generation {
            platform: Platform::Twitter,
            ..
        })
    ));
    // Nothing was published or recorded.
    assert_eq!(publisher.attempts(Platform::LinkedIn), 0);
    assert!(articles.is_empty());
}

#[tokio::test]
async fn test_start_rejects_empty_platform_config() {
    let config = PipelineConfig {
        platforms: Vec::new(),
        ..test_config()
    };
    let h = harness(config, stocked_fetcher(), MockPublisher::new());

    let result = h.orchestrator.start("run-1").await;
    assert!(matches!(result, Err(PipelineError::Internal(_))));
    // Nothing was persisted; the id remains free.
    assert!(h.checkpoints.load_run("run-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_store_error_during_exclusion_fails_the_run() {
    init_test_logging();
    let checkpoints = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = Orchestrator::new(
        test_config(),
        Arc::new(stocked_fetcher()),
        Arc::new(MockDrafter::new()),
        Arc::new(MockPublisher::new()),
        Arc::new(FailingArticleStore::new()),
        Arc::clone(&checkpoints) as Arc<dyn CheckpointStore>,
    );

    let result = orchestrator.start("run-1").await;
    assert!(matches!(result, Err(PipelineError::Store(_))));

    let run = checkpoints.load_run("run-1").await.unwrap().unwrap();
    assert_eq!(run.phase, RunPhase::Failed);
    assert!(matches!(run.failure, Some(FailureCause::Store { .. })));
}

#[tokio::test]
async fn test_store_error_during_record_fails_the_run() {
    init_test_logging();
    let checkpoints = Arc::new(MemoryCheckpointStore::new());
    let publisher = Arc::new(MockPublisher::new());
    let orchestrator = Orchestrator::new(
        test_config(),
        Arc::new(stocked_fetcher()),
        Arc::new(MockDrafter::new()),
        Arc::clone(&publisher) as Arc<dyn crate::publish::Publisher>,
        Arc::new(FailingArticleStore::failing_on_write()),
        Arc::clone(&checkpoints) as Arc<dyn CheckpointStore>,
    );

    orchestrator.start("run-1").await.unwrap();
    let result = orchestrator.resume("run-1", Decision::Approved).await;
    assert!(matches!(result, Err(PipelineError::Store(_))));

    // The posts went out before the record write failed; publication is
    // never rolled back, but the run lands at Failed with the cause kept.
    assert_eq!(publisher.attempts(Platform::LinkedIn), 1);
    assert_eq!(publisher.attempts(Platform::Twitter), 1);
    let run = checkpoints.load_run("run-1").await.unwrap().unwrap();
    assert_eq!(run.phase, RunPhase::Failed);
    assert!(matches!(run.failure, Some(FailureCause::Store { .. })));
}

#[tokio::test]
async fn test_rejection_leaves_article_eligible() {
    let h = harness(test_config(), stocked_fetcher(), MockPublisher::new());

    h.orchestrator.start("run-1").await.unwrap();
    let outcome = h
        .orchestrator
        .resume("run-1", Decision::Rejected)
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Rejected);
    assert_eq!(h.publisher.attempts(Platform::LinkedIn), 0);
    assert!(h.articles.is_empty());

    // The same article can win a later run.
    h.orchestrator.start("run-2").await.unwrap();
    let run = h.checkpoints.load_run("run-2").await.unwrap().unwrap();
    assert_eq!(run.winner.unwrap().url, "https://arxiv.example/paper/1");
}

#[tokio::test]
async fn test_concurrent_decisions_accept_exactly_one() {
    let h = harness(test_config(), stocked_fetcher(), MockPublisher::new());
    h.orchestrator.start("run-1").await.unwrap();

    let approve = h.orchestrator.resume("run-1", Decision::Approved);
    let reject = h.orchestrator.resume("run-1", Decision::Rejected);
    let (a, r) = tokio::join!(approve, reject);

    let oks = [a.is_ok(), r.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(oks, 1);
    let err = if a.is_err() { a.unwrap_err() } else { r.unwrap_err() };
    assert!(matches!(
        err,
        PipelineError::Resume(ResumeError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn test_resume_after_restart_skips_earlier_stages() {
    let checkpoint_dir = tempfile::tempdir().unwrap();
    let article_dir = tempfile::tempdir().unwrap();

    {
        let orchestrator = Orchestrator::new(
            test_config(),
            Arc::new(stocked_fetcher()),
            Arc::new(MockDrafter::new()),
            Arc::new(MockPublisher::new()),
            Arc::new(FileArticleStore::open(article_dir.path()).unwrap()),
            Arc::new(FileCheckpointStore::open(checkpoint_dir.path()).unwrap()),
        );
        let outcome = orchestrator.start("news-20260829").await.unwrap();
        assert!(matches!(outcome, RunOutcome::AwaitingApproval { .. }));
        // All in-memory state is dropped here; only the files survive.
    }

    let fetcher = Arc::new(MockFetcher::new());
    let drafter = Arc::new(MockDrafter::new());
    let publisher = Arc::new(MockPublisher::new());
    let articles = Arc::new(FileArticleStore::open(article_dir.path()).unwrap());
    let orchestrator = Orchestrator::new(
        test_config(),
        Arc::clone(&fetcher) as Arc<dyn crate::fetch::FetchSource>,
        Arc::clone(&drafter) as Arc<dyn crate::draft::DraftGenerator>,
        Arc::clone(&publisher) as Arc<dyn crate::publish::Publisher>,
        Arc::clone(&articles) as Arc<dyn ArticleStore>,
        Arc::new(FileCheckpointStore::open(checkpoint_dir.path()).unwrap()),
    );

    let outcome = orchestrator
        .resume("news-20260829", Decision::Approved)
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Published { .. }));

    // Resume continued from the persisted phase: no re-fetch, no re-curate,
    // no re-draft.
    assert_eq!(fetcher.call_count(), 0);
    assert_eq!(drafter.call_count(), 0);
    assert_eq!(publisher.attempts(Platform::LinkedIn), 1);
    assert_eq!(publisher.attempts(Platform::Twitter), 1);
}

#[tokio::test]
async fn test_transient_failures_then_success_publishes_once() {
    let publisher = MockPublisher::new().script(
        Platform::Twitter,
        vec![
            Err(PublishError::transient("503")),
            Err(PublishError::transient("503")),
            Err(PublishError::transient("timeout")),
            Err(PublishError::transient("429")),
            Ok("https://twitter.example/status/9".to_string()),
        ],
    );
    let h = harness(test_config(), stocked_fetcher(), publisher);

    h.orchestrator.start("run-1").await.unwrap();
    let outcome = h
        .orchestrator
        .resume("run-1", Decision::Approved)
        .await
        .unwrap();

    let RunOutcome::Published { record, .. } = outcome else {
        panic!("expected publication");
    };
    assert_eq!(h.publisher.attempts(Platform::Twitter), 5);
    assert_eq!(
        record.platform_urls.get(&Platform::Twitter).unwrap(),
        "https://twitter.example/status/9"
    );
    assert_eq!(h.articles.len(), 1);
}

#[tokio::test]
async fn test_permanent_error_fails_run_without_retry() {
    let publisher = MockPublisher::new().script(
        Platform::Twitter,
        vec![Err(PublishError::permanent("401 unauthorized"))],
    );
    let h = harness(test_config(), stocked_fetcher(), publisher);

    h.orchestrator.start("run-1").await.unwrap();
    let result = h.orchestrator.resume("run-1", Decision::Approved).await;

    let Err(PipelineError::Publish(failure)) = result else {
        panic!("expected a publish failure");
    };
    assert_eq!(failure.platform, Platform::Twitter);
    assert!(!failure.error.is_transient());
    // LinkedIn published first and is not rolled back.
    assert!(failure.published.contains_key(&Platform::LinkedIn));
    assert_eq!(h.publisher.attempts(Platform::Twitter), 1);

    let run = h.checkpoints.load_run("run-1").await.unwrap().unwrap();
    assert_eq!(run.phase, RunPhase::Failed);
    assert!(matches!(
        run.failure,
        Some(FailureCause::Publish {
            platform: Platform::Twitter,
            transient: false,
            ..
        })
    ));
    // No record: the run did not complete.
    assert!(h.articles.is_empty());
}

#[tokio::test]
async fn test_optional_platform_failure_does_not_fail_the_run() {
    let config = PipelineConfig {
        platforms: vec![
            PlatformConfig::required(Platform::LinkedIn),
            PlatformConfig::optional(Platform::Twitter),
        ],
        ..test_config()
    };
    let publisher = MockPublisher::new().script(
        Platform::Twitter,
        vec![Err(PublishError::permanent("400 bad payload"))],
    );
    let h = harness(config, stocked_fetcher(), publisher);

    h.orchestrator.start("run-1").await.unwrap();
    let outcome = h
        .orchestrator
        .resume("run-1", Decision::Approved)
        .await
        .unwrap();

    let RunOutcome::Published {
        record,
        optional_failures,
    } = outcome
    else {
        panic!("expected publication");
    };
    assert!(optional_failures.contains_key(&Platform::Twitter));
    assert!(record.platform_urls.contains_key(&Platform::LinkedIn));
    assert!(!record.platform_urls.contains_key(&Platform::Twitter));

    let run = h.checkpoints.load_run("run-1").await.unwrap().unwrap();
    assert_eq!(run.phase, RunPhase::Completed);
}

#[tokio::test]
async fn test_one_bad_source_still_produces_a_winner() {
    let now = Utc::now();
    let fetcher = MockFetcher::new()
        .with_error(
            "ArXiv AI",
            crate::errors::FetchError::feed("ArXiv AI", "malformed xml"),
        )
        .with_articles(
            "TechCrunch AI",
            vec![sample_article(
                "https://tc.example/story/1",
                "AI chip news",
                "ai",
                2,
                "TechCrunch AI",
                now,
            )],
        );
    let h = harness(test_config(), fetcher, MockPublisher::new());

    let outcome = h.orchestrator.start("run-1").await.unwrap();
    assert!(matches!(outcome, RunOutcome::AwaitingApproval { .. }));
    let run = h.checkpoints.load_run("run-1").await.unwrap().unwrap();
    assert_eq!(run.winner.unwrap().url, "https://tc.example/story/1");
}
