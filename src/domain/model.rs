use crate::utils::error::{PurgeError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The authenticated principal whose account is being deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// One unit of the deletion workflow. The derived ordering is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStep {
    Habits,
    Categories,
    Content,
    SocialGraph,
    Profile,
    Identity,
}

impl DeletionStep {
    pub const ALL: [DeletionStep; 6] = [
        DeletionStep::Habits,
        DeletionStep::Categories,
        DeletionStep::Content,
        DeletionStep::SocialGraph,
        DeletionStep::Profile,
        DeletionStep::Identity,
    ];

    /// Steps whose stores hold records owned by the profile. They do not depend on each other.
    pub const DEPENDENTS: [DeletionStep; 4] = [
        DeletionStep::Habits,
        DeletionStep::Categories,
        DeletionStep::Content,
        DeletionStep::SocialGraph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStep::Habits => "habits",
            DeletionStep::Categories => "categories",
            DeletionStep::Content => "content",
            DeletionStep::SocialGraph => "social_graph",
            DeletionStep::Profile => "profile",
            DeletionStep::Identity => "identity",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DeletionStep::Habits => "habit records",
            DeletionStep::Categories => "category records",
            DeletionStep::Content => "posts, comments and likes",
            DeletionStep::SocialGraph => "friendships and pending requests",
            DeletionStep::Profile => "the user profile",
            DeletionStep::Identity => "the sign-in identity",
        }
    }

    pub fn is_dependent(&self) -> bool {
        Self::DEPENDENTS.contains(self)
    }

    /// After this step succeeds the identity can no longer be resolved.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeletionStep::Identity)
    }
}

impl fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collaborator error attached to a failed step, passed through unchanged.
pub type ErrorDetail = Arc<PurgeError>;

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: DeletionStep,
    pub succeeded: bool,
    pub cause: Option<ErrorDetail>,
    pub duration: Duration,
}

impl StepOutcome {
    pub fn success(step: DeletionStep, duration: Duration) -> Self {
        Self {
            step,
            succeeded: true,
            cause: None,
            duration,
        }
    }

    pub fn failure(step: DeletionStep, cause: PurgeError, duration: Duration) -> Self {
        Self {
            step,
            succeeded: false,
            cause: Some(Arc::new(cause)),
            duration,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeletionFailure {
    /// No identity could be resolved; nothing was attempted.
    NotAuthenticated { detail: Option<ErrorDetail> },
    StepFailed { step: DeletionStep, cause: ErrorDetail },
}

impl fmt::Display for DeletionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionFailure::NotAuthenticated { detail: None } => f.write_str("not authenticated"),
            DeletionFailure::NotAuthenticated { detail: Some(e) } => {
                write!(f, "not authenticated: {}", e)
            }
            DeletionFailure::StepFailed { step, cause } => write!(f, "step {} failed: {}", step, cause),
        }
    }
}

/// Outcome of one `delete_account` invocation.
#[derive(Debug, Clone)]
pub struct DeletionResult {
    pub user_id: Option<String>,
    pub outcomes: Vec<StepOutcome>,
    pub succeeded: bool,
    pub failure: Option<DeletionFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DeletionResult {
    pub(crate) fn begin(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: Some(user_id.to_string()),
            outcomes: Vec::with_capacity(DeletionStep::ALL.len()),
            succeeded: false,
            failure: None,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn not_authenticated(detail: Option<PurgeError>) -> Self {
        let now = Utc::now();
        Self {
            user_id: None,
            outcomes: Vec::new(),
            succeeded: false,
            failure: Some(DeletionFailure::NotAuthenticated {
                detail: detail.map(Arc::new),
            }),
            started_at: now,
            finished_at: now,
        }
    }

    /// Records an outcome. The first failed step becomes the reported failure.
    pub(crate) fn record(&mut self, outcome: StepOutcome) {
        if self.failure.is_none() {
            if let Some(cause) = &outcome.cause {
                self.failure = Some(DeletionFailure::StepFailed {
                    step: outcome.step,
                    cause: Arc::clone(cause),
                });
            }
        }
        self.outcomes.push(outcome);
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self.succeeded = self.failure.is_none()
            && self.outcomes.len() == DeletionStep::ALL.len()
            && self.outcomes.iter().all(|o| o.succeeded);
        self
    }

    pub fn is_success(&self) -> bool {
        self.succeeded
    }

    pub fn steps_attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed_step(&self) -> Option<DeletionStep> {
        match &self.failure {
            Some(DeletionFailure::StepFailed { step, .. }) => Some(*step),
            _ => None,
        }
    }

    pub fn is_not_authenticated(&self) -> bool {
        matches!(self.failure, Some(DeletionFailure::NotAuthenticated { .. }))
    }

    pub fn completed_steps(&self) -> Vec<DeletionStep> {
        self.outcomes
            .iter()
            .filter(|o| o.succeeded)
            .map(|o| o.step)
            .collect()
    }

    /// Steps whose stores may still hold data for the user.
    pub fn residual_steps(&self) -> Vec<DeletionStep> {
        let completed = self.completed_steps();
        DeletionStep::ALL
            .into_iter()
            .filter(|step| !completed.contains(step))
            .collect()
    }

    pub fn total_duration(&self) -> Duration {
        self.outcomes.iter().map(|o| o.duration).sum()
    }

    /// Converts a failed result into the matching error, keeping the collaborator cause intact.
    pub fn into_result(self) -> Result<DeletionResult> {
        if self.succeeded {
            return Ok(self);
        }
        match self.failure {
            Some(DeletionFailure::StepFailed { step, cause }) => Err(PurgeError::StepFailed {
                step,
                source: cause,
            }),
            Some(DeletionFailure::NotAuthenticated { .. }) => Err(PurgeError::NotAuthenticated),
            None => Err(PurgeError::IncompleteDeletion {
                attempted: self.outcomes.len(),
                total: DeletionStep::ALL.len(),
            }),
        }
    }

    /// Execution summary for reporting.
    pub fn summary(&self) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        summary.insert("succeeded".to_string(), serde_json::Value::Bool(self.succeeded));
        summary.insert(
            "user_id".to_string(),
            self.user_id
                .clone()
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
        );
        summary.insert(
            "steps_attempted".to_string(),
            serde_json::Value::Number(self.steps_attempted().into()),
        );
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((self.total_duration().as_millis() as u64).into()),
        );

        let steps: Vec<serde_json::Value> = self
            .outcomes
            .iter()
            .map(|o| {
                serde_json::json!({
                    "step": o.step.as_str(),
                    "succeeded": o.succeeded,
                    "duration_ms": o.duration.as_millis() as u64,
                    "cause": o.cause.as_ref().map(|c| c.to_string()),
                })
            })
            .collect();
        summary.insert("steps".to_string(), serde_json::Value::Array(steps));

        summary.insert(
            "failure".to_string(),
            self.failure
                .as_ref()
                .map(|f| serde_json::Value::String(f.to_string()))
                .unwrap_or(serde_json::Value::Null),
        );

        if !self.succeeded && !self.is_not_authenticated() {
            let residual: Vec<serde_json::Value> = self
                .residual_steps()
                .iter()
                .map(|s| serde_json::Value::String(s.as_str().to_string()))
                .collect();
            summary.insert("residual_stores".to_string(), serde_json::Value::Array(residual));
        }

        summary
    }
}
