pub mod orchestrator;

pub use crate::domain::model::{DeletionResult, DeletionStep, StepOutcome, UserIdentity};
pub use crate::domain::ports::StorePorts;
pub use crate::utils::error::Result;
pub use orchestrator::{AccountDeletionOrchestrator, DeletionOptions, FailurePolicy};
