pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::{build_ports, HttpBackend, InMemoryBackend};
pub use crate::config::PurgeConfig;
pub use crate::core::orchestrator::{AccountDeletionOrchestrator, DeletionOptions, FailurePolicy};
pub use crate::domain::model::{
    DeletionFailure, DeletionResult, DeletionStep, ErrorDetail, StepOutcome, UserIdentity,
};
pub use crate::domain::ports::{
    CategoryStore, ContentStore, HabitStore, IdentityProvider, ProfileStore, SocialGraphStore,
    StorePorts,
};
pub use crate::utils::error::{PurgeError, Result};
