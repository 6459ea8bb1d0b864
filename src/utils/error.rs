use crate::domain::model::DeletionStep;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PurgeError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("{store} store error{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    BackendError {
        store: String,
        status: Option<u16>,
        message: String,
    },

    #[error("No authenticated user to delete")]
    NotAuthenticated,

    #[error("Session resolved to an unusable identity: {reason}")]
    InvalidIdentity { reason: String },

    #[error("Deletion step '{step}' failed")]
    StepFailed {
        step: DeletionStep,
        #[source]
        source: Arc<PurgeError>,
    },

    #[error("Deletion stopped after {attempted} of {total} steps without a reported failure")]
    IncompleteDeletion { attempted: usize, total: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Backend,
    Authentication,
    Deletion,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PurgeError {
    pub fn backend(store: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        PurgeError::BackendError {
            store: store.into(),
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        PurgeError::NetworkError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PurgeError::ConfigError { .. }
            | PurgeError::ConfigValidationError { .. }
            | PurgeError::InvalidConfigValueError { .. }
            | PurgeError::MissingConfigError { .. } => ErrorCategory::Configuration,
            PurgeError::ApiError(_) | PurgeError::NetworkError { .. } => ErrorCategory::Network,
            PurgeError::BackendError { .. } => ErrorCategory::Backend,
            PurgeError::NotAuthenticated | PurgeError::InvalidIdentity { .. } => {
                ErrorCategory::Authentication
            }
            PurgeError::StepFailed { .. } | PurgeError::IncompleteDeletion { .. } => {
                ErrorCategory::Deletion
            }
            PurgeError::IoError(_) | PurgeError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // nothing was deleted
            PurgeError::NotAuthenticated => ErrorSeverity::High,
            PurgeError::ApiError(_) | PurgeError::NetworkError { .. } => ErrorSeverity::Medium,
            PurgeError::BackendError { status, .. } => match status {
                Some(s) if *s >= 500 => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            // a partially deleted account is worse than a failed lookup
            PurgeError::StepFailed { .. } | PurgeError::IncompleteDeletion { .. } => {
                ErrorSeverity::Critical
            }
            PurgeError::IoError(_) | PurgeError::SerializationError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PurgeError::ApiError(e) => e.is_timeout() || e.is_connect(),
            PurgeError::NetworkError { .. } => true,
            PurgeError::BackendError { status, .. } => {
                matches!(status, Some(s) if *s >= 500 || *s == 429)
            }
            // retrying the whole deletion is safe, every store delete is idempotent
            PurgeError::StepFailed { .. } | PurgeError::IncompleteDeletion { .. } => true,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the configuration file and environment variables",
            ErrorCategory::Network => "Check network connectivity to the account API and retry",
            ErrorCategory::Backend => "Inspect the failing store's logs; retry once it is healthy",
            ErrorCategory::Authentication => "Sign in again before requesting account deletion",
            ErrorCategory::Deletion => {
                "The account is only partially deleted. Retry the deletion; completed steps are safe to repeat"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PurgeError::NotAuthenticated => {
                "No signed-in account was found. Nothing was deleted.".to_string()
            }
            PurgeError::InvalidIdentity { .. } => {
                "The signed-in account could not be identified. Nothing was deleted.".to_string()
            }
            PurgeError::StepFailed { step, .. } => format!(
                "Account deletion is incomplete: removing {} failed. Please retry.",
                step.description()
            ),
            PurgeError::NetworkError { .. } | PurgeError::ApiError(_) => {
                "Could not reach the account service.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PurgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failed_is_critical_and_retryable() {
        let err = PurgeError::StepFailed {
            step: DeletionStep::Content,
            source: Arc::new(PurgeError::network("connection reset")),
        };
        assert_eq!(err.category(), ErrorCategory::Deletion);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.is_retryable());
        assert!(err.user_friendly_message().contains("incomplete"));
        assert_eq!(err.to_string(), "Deletion step 'content' failed");
    }

    #[test]
    fn test_step_failed_cause_is_only_in_the_source_chain() {
        let err = PurgeError::StepFailed {
            step: DeletionStep::Habits,
            source: Arc::new(PurgeError::network("connection reset")),
        };

        let chain: Vec<String> = std::iter::successors(
            Some(&err as &(dyn std::error::Error + 'static)),
            |e| e.source(),
        )
        .map(|e| e.to_string())
        .collect();

        assert_eq!(chain.len(), 2);
        assert!(!chain[0].contains("connection reset"));
        assert_eq!(chain[1], "Network error: connection reset");

        let report = format!("{:?}", anyhow::Error::new(err));
        assert_eq!(report.matches("connection reset").count(), 1);
    }

    #[test]
    fn test_not_authenticated_is_not_retryable() {
        let err = PurgeError::NotAuthenticated;
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert!(!err.is_retryable());
        assert!(err.user_friendly_message().contains("Nothing was deleted"));
    }

    #[test]
    fn test_backend_error_status_drives_severity() {
        let server_side = PurgeError::backend("habits", Some(503), "unavailable");
        assert_eq!(server_side.severity(), ErrorSeverity::Medium);
        assert!(server_side.is_retryable());
        assert_eq!(server_side.to_string(), "habits store error (HTTP 503): unavailable");

        let forbidden = PurgeError::backend("profile", Some(403), "forbidden");
        assert_eq!(forbidden.severity(), ErrorSeverity::High);
        assert!(!forbidden.is_retryable());

        let no_status = PurgeError::backend("content", None, "rejected");
        assert_eq!(no_status.to_string(), "content store error: rejected");
    }
}
