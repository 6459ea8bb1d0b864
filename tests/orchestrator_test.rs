use account_purge::{
    AccountDeletionOrchestrator, CategoryStore, ContentStore, DeletionFailure, DeletionStep,
    HabitStore, IdentityProvider, InMemoryBackend, ProfileStore, PurgeError, Result,
    SocialGraphStore, StorePorts, UserIdentity,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Records every port call. The session survives identity deletion so the same
/// user can be deleted twice in a row.
#[derive(Default)]
struct RecordingBackend {
    user: Option<UserIdentity>,
    failing: Option<DeletionStep>,
    resolve_fails: bool,
    calls: Mutex<Vec<DeletionStep>>,
}

impl RecordingBackend {
    fn signed_in(id: &str) -> Self {
        Self {
            user: Some(UserIdentity::new(id).with_email(format!("{}@example.com", id))),
            ..Default::default()
        }
    }

    fn failing_at(mut self, step: DeletionStep) -> Self {
        self.failing = Some(step);
        self
    }

    fn calls(&self) -> Vec<DeletionStep> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, step: DeletionStep) -> Result<()> {
        self.calls.lock().unwrap().push(step);
        if self.failing == Some(step) {
            Err(PurgeError::network("NetworkError"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityProvider for RecordingBackend {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        if self.resolve_fails {
            return Err(PurgeError::backend("session", Some(500), "session service down"));
        }
        Ok(self.user.clone())
    }

    async fn delete_current_identity(&self) -> Result<()> {
        self.respond(DeletionStep::Identity)
    }
}

#[async_trait]
impl HabitStore for RecordingBackend {
    async fn delete_all_for_user(&self, _user_id: &str) -> Result<()> {
        self.respond(DeletionStep::Habits)
    }
}

#[async_trait]
impl CategoryStore for RecordingBackend {
    async fn delete_all_for_user(&self, _user_id: &str) -> Result<()> {
        self.respond(DeletionStep::Categories)
    }
}

#[async_trait]
impl ContentStore for RecordingBackend {
    async fn delete_user_content(&self, _user_id: &str) -> Result<()> {
        self.respond(DeletionStep::Content)
    }
}

#[async_trait]
impl SocialGraphStore for RecordingBackend {
    async fn delete_user_data(&self, _user_id: &str) -> Result<()> {
        self.respond(DeletionStep::SocialGraph)
    }
}

#[async_trait]
impl ProfileStore for RecordingBackend {
    async fn delete_user(&self, _user_id: &str) -> Result<()> {
        self.respond(DeletionStep::Profile)
    }
}

fn orchestrator_for(backend: &Arc<RecordingBackend>) -> AccountDeletionOrchestrator {
    AccountDeletionOrchestrator::new(StorePorts::from_backend(backend.clone()))
}

#[tokio::test]
async fn test_all_stores_succeed() {
    let backend = Arc::new(RecordingBackend::signed_in("u1"));

    let result = orchestrator_for(&backend).delete_account().await;

    assert!(result.succeeded);
    assert_eq!(result.steps_attempted(), 6);
    assert!(result.outcomes.iter().all(|o| o.succeeded && o.cause.is_none()));
    assert_eq!(result.user_id.as_deref(), Some("u1"));
    assert_eq!(backend.calls(), DeletionStep::ALL.to_vec());
    assert!(result.finished_at >= result.started_at);
}

#[tokio::test]
async fn test_content_failure_stops_before_social_graph() {
    let backend = Arc::new(RecordingBackend::signed_in("u1").failing_at(DeletionStep::Content));

    let result = orchestrator_for(&backend).delete_account().await;

    assert!(!result.succeeded);
    assert_eq!(result.steps_attempted(), 3);
    assert!(result.outcomes[0].succeeded);
    assert!(result.outcomes[1].succeeded);
    assert!(!result.outcomes[2].succeeded);
    assert_eq!(result.outcomes[2].step, DeletionStep::Content);
    assert_eq!(
        backend.calls(),
        vec![DeletionStep::Habits, DeletionStep::Categories, DeletionStep::Content]
    );

    match &result.failure {
        Some(DeletionFailure::StepFailed { step, cause }) => {
            assert_eq!(*step, DeletionStep::Content);
            assert!(matches!(**cause, PurgeError::NetworkError { .. }));
        }
        other => panic!("expected step failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_no_session_fails_fast() {
    let backend = Arc::new(RecordingBackend::default());

    let result = orchestrator_for(&backend).delete_account().await;

    assert!(!result.succeeded);
    assert_eq!(result.steps_attempted(), 0);
    assert!(matches!(
        result.failure,
        Some(DeletionFailure::NotAuthenticated { detail: None })
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_identity_lookup_error_is_reported_as_not_authenticated() {
    let backend = Arc::new(RecordingBackend {
        resolve_fails: true,
        ..RecordingBackend::signed_in("u1")
    });

    let result = orchestrator_for(&backend).delete_account().await;

    assert!(result.is_not_authenticated());
    assert_eq!(result.steps_attempted(), 0);
    match &result.failure {
        Some(DeletionFailure::NotAuthenticated { detail: Some(detail) }) => {
            assert!(matches!(**detail, PurgeError::BackendError { status: Some(500), .. }));
        }
        other => panic!("expected lookup error detail, got {:?}", other),
    }
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_blank_user_id_deletes_nothing() {
    for id in ["", "   "] {
        let backend = Arc::new(RecordingBackend::signed_in(id));

        let result = orchestrator_for(&backend).delete_account().await;

        assert!(!result.succeeded);
        assert!(result.is_not_authenticated());
        assert_eq!(result.steps_attempted(), 0);
        match &result.failure {
            Some(DeletionFailure::NotAuthenticated { detail: Some(detail) }) => {
                assert!(matches!(**detail, PurgeError::InvalidIdentity { .. }));
            }
            other => panic!("expected invalid identity detail, got {:?}", other),
        }
        assert!(backend.calls().is_empty());
    }
}

#[tokio::test]
async fn test_failure_at_each_step_halts_the_remaining_steps() {
    for (k, failing) in DeletionStep::ALL.into_iter().enumerate() {
        let backend = Arc::new(RecordingBackend::signed_in("u1").failing_at(failing));

        let result = orchestrator_for(&backend).delete_account().await;

        assert!(!result.succeeded, "step {} should fail the run", failing);
        assert_eq!(result.steps_attempted(), k + 1);
        assert_eq!(backend.calls(), DeletionStep::ALL[..=k].to_vec());
        assert_eq!(result.failed_step(), Some(failing));
        assert_eq!(result.completed_steps(), DeletionStep::ALL[..k].to_vec());
        assert_eq!(result.residual_steps(), DeletionStep::ALL[k..].to_vec());
    }
}

#[tokio::test]
async fn test_repeating_a_successful_deletion_succeeds() {
    let backend = Arc::new(RecordingBackend::signed_in("u1"));
    let orchestrator = orchestrator_for(&backend);

    let first = orchestrator.delete_account().await;
    let second = orchestrator.delete_account().await;

    assert!(first.succeeded);
    assert!(second.succeeded);
    assert!(second.failure.is_none());
    assert_eq!(backend.calls().len(), 12);
}

#[tokio::test]
async fn test_retry_after_partial_failure_completes_deletion() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.sign_in(UserIdentity::new("u1"));
    backend.seed_user("u1", 4);
    backend.seed_user("someone-else", 2);
    backend.fail_next(DeletionStep::Content, PurgeError::network("NetworkError"));
    let orchestrator = AccountDeletionOrchestrator::new(StorePorts::from_backend(backend.clone()));

    let first = orchestrator.delete_account().await;

    assert!(!first.succeeded);
    assert_eq!(first.steps_attempted(), 3);
    assert_eq!(first.failed_step(), Some(DeletionStep::Content));
    assert!(backend.has_profile("u1"));
    assert!(backend.has_identity("u1"));

    // habits and categories are already empty, deleting them again is a no-op
    let second = orchestrator.delete_account().await;

    assert!(second.succeeded);
    assert_eq!(second.steps_attempted(), 6);
    assert_eq!(backend.remaining_records("u1"), 0);
    assert!(!backend.has_identity("u1"));
    assert!(backend.current_identity().is_none());
    assert_eq!(backend.remaining_records("someone-else"), 2 * 7 + 1);

    // identity is gone, so there is nobody left to delete
    let third = orchestrator.delete_account().await;
    assert!(third.is_not_authenticated());
    assert_eq!(backend.calls().len(), 3 + 6);
}

#[tokio::test]
async fn test_store_that_keeps_failing_blocks_every_retry_until_fixed() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.sign_in(UserIdentity::new("u1"));
    backend.seed_user("u1", 2);
    backend.fail_always(DeletionStep::SocialGraph, || {
        PurgeError::backend("social_graph", Some(503), "graph store down")
    });
    let orchestrator = AccountDeletionOrchestrator::new(StorePorts::from_backend(backend.clone()));

    for _ in 0..2 {
        let attempt = orchestrator.delete_account().await;

        assert!(!attempt.succeeded);
        assert_eq!(attempt.steps_attempted(), 4);
        assert_eq!(attempt.failed_step(), Some(DeletionStep::SocialGraph));
        assert!(backend.has_profile("u1"));
        assert!(backend.has_identity("u1"));
    }

    backend.clear_failures();
    let third = orchestrator.delete_account().await;

    assert!(third.succeeded);
    assert_eq!(backend.remaining_records("u1"), 0);
    assert!(!backend.has_identity("u1"));
    assert_eq!(backend.calls().len(), 4 + 4 + 6);
}

#[tokio::test]
async fn test_failed_result_converts_to_step_failed_error() {
    let backend = Arc::new(RecordingBackend::signed_in("u1").failing_at(DeletionStep::Profile));

    let result = orchestrator_for(&backend).delete_account().await;
    let summary = result.summary();
    let err = result.into_result().unwrap_err();

    assert!(matches!(
        err,
        PurgeError::StepFailed { step: DeletionStep::Profile, .. }
    ));
    assert!(err.is_retryable());

    let residual = summary.get("residual_stores").unwrap().as_array().unwrap();
    assert_eq!(residual.len(), 2);
    assert_eq!(summary.get("steps_attempted").unwrap(), &serde_json::json!(5));
}
