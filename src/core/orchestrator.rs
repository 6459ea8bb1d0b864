use crate::domain::model::{DeletionResult, DeletionStep, StepOutcome, UserIdentity};
use crate::domain::ports::StorePorts;
use crate::utils::error::{PurgeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// What to do with the remaining steps once one has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Halt at the first failed step.
    #[default]
    #[serde(rename = "stop")]
    StopOnFirstFailure,
    /// Keep removing dependent records after a failure. Profile and identity
    /// still only run when every earlier step succeeded.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeletionOptions {
    pub failure_policy: FailurePolicy,
    /// Delete habits, categories, content and social graph at the same time.
    pub concurrent_dependents: bool,
}

/// Erases a user's data across every store, dependents first, identity last.
///
/// Holds no state between invocations; each call to [`delete_account`] builds a
/// fresh [`DeletionResult`]. Deletions are never rolled back, a failed run is
/// recovered by calling [`delete_account`] again.
///
/// [`delete_account`]: AccountDeletionOrchestrator::delete_account
pub struct AccountDeletionOrchestrator {
    ports: StorePorts,
    options: DeletionOptions,
}

impl AccountDeletionOrchestrator {
    pub fn new(ports: StorePorts) -> Self {
        Self {
            ports,
            options: DeletionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DeletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DeletionOptions {
        &self.options
    }

    /// The steps a successful run executes, in order.
    pub fn plan(&self) -> &'static [DeletionStep] {
        &DeletionStep::ALL
    }

    pub async fn delete_account(&self) -> DeletionResult {
        let user = match self.ports.identity.current_user().await {
            // a blank id would address no user's records while identity deletion still succeeds
            Ok(Some(user)) if user.id.trim().is_empty() => {
                tracing::error!("🚫 Session resolved to a blank user id, refusing to delete");
                return DeletionResult::not_authenticated(Some(PurgeError::InvalidIdentity {
                    reason: "user id is blank".to_string(),
                }));
            }
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!("🚫 No authenticated user, nothing to delete");
                return DeletionResult::not_authenticated(None);
            }
            Err(e) => {
                tracing::error!("🚫 Could not resolve the current user: {}", e);
                return DeletionResult::not_authenticated(Some(e));
            }
        };

        tracing::info!(
            "🗑️ Starting account deletion for user {} (policy: {:?}, concurrent dependents: {})",
            user.id,
            self.options.failure_policy,
            self.options.concurrent_dependents
        );

        let mut result = DeletionResult::begin(&user.id);

        if self.options.concurrent_dependents {
            self.execute_dependents_concurrently(&user, &mut result).await;
        }

        for step in DeletionStep::ALL {
            if self.options.concurrent_dependents && step.is_dependent() {
                continue;
            }

            if result.failure.is_some() && !self.continues_after_failure(step) {
                tracing::warn!(
                    "⏭️ Skipping {} and later steps after failure of {}",
                    step,
                    result.failed_step().map(|s| s.as_str()).unwrap_or("unknown")
                );
                break;
            }

            let outcome = self.execute_step(step, &user).await;
            let identity_gone = step.is_terminal() && outcome.succeeded;
            result.record(outcome);

            if identity_gone {
                break;
            }
        }

        let result = result.finish();

        if result.succeeded {
            tracing::info!(
                "✅ Account {} deleted ({} steps, {:?})",
                user.id,
                result.steps_attempted(),
                result.total_duration()
            );
        } else {
            let residual: Vec<&str> = result.residual_steps().iter().map(|s| s.as_str()).collect();
            tracing::error!(
                "❌ Account deletion for {} incomplete, stores that may still hold data: {}",
                user.id,
                residual.join(", ")
            );
        }

        result
    }

    fn continues_after_failure(&self, step: DeletionStep) -> bool {
        match self.options.failure_policy {
            FailurePolicy::StopOnFirstFailure => false,
            FailurePolicy::BestEffort => step.is_dependent(),
        }
    }

    /// Outcomes are recorded in step order regardless of completion order.
    async fn execute_dependents_concurrently(&self, user: &UserIdentity, result: &mut DeletionResult) {
        let (habits, categories, content, social_graph) = tokio::join!(
            self.execute_step(DeletionStep::Habits, user),
            self.execute_step(DeletionStep::Categories, user),
            self.execute_step(DeletionStep::Content, user),
            self.execute_step(DeletionStep::SocialGraph, user),
        );

        for outcome in [habits, categories, content, social_graph] {
            result.record(outcome);
        }
    }

    async fn execute_step(&self, step: DeletionStep, user: &UserIdentity) -> StepOutcome {
        let start_time = Instant::now();
        tracing::debug!("▶️ Deleting {} for user {}", step.description(), user.id);

        match self.dispatch(step, &user.id).await {
            Ok(()) => {
                let duration = start_time.elapsed();
                tracing::info!("✅ Step {} completed ({:?})", step, duration);
                StepOutcome::success(step, duration)
            }
            Err(e) => {
                let duration = start_time.elapsed();
                tracing::error!("❌ Step {} failed: {}", step, e);
                StepOutcome::failure(step, e, duration)
            }
        }
    }

    async fn dispatch(&self, step: DeletionStep, user_id: &str) -> Result<()> {
        match step {
            DeletionStep::Habits => self.ports.habits.delete_all_for_user(user_id).await,
            DeletionStep::Categories => self.ports.categories.delete_all_for_user(user_id).await,
            DeletionStep::Content => self.ports.content.delete_user_content(user_id).await,
            DeletionStep::SocialGraph => self.ports.social_graph.delete_user_data(user_id).await,
            DeletionStep::Profile => self.ports.profile.delete_user(user_id).await,
            DeletionStep::Identity => self.ports.identity.delete_current_identity().await,
        }
    }
}
