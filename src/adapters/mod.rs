// Adapters layer: concrete store port implementations.

pub mod http;
pub mod memory;

use crate::config::{BackendKind, PurgeConfig};
use crate::domain::model::UserIdentity;
use crate::domain::ports::StorePorts;
use crate::utils::error::{PurgeError, Result};
use std::sync::Arc;

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

/// Builds the store ports selected by `[backend]`.
pub fn build_ports(config: &PurgeConfig) -> Result<StorePorts> {
    match config.backend.r#type {
        BackendKind::Http => {
            let base_url = config
                .backend
                .base_url
                .as_deref()
                .ok_or_else(|| PurgeError::MissingConfigError {
                    field: "backend.base_url".to_string(),
                })?;
            let mut backend = HttpBackend::new(base_url, config.timeout())?;
            if let Some(token) = &config.backend.auth_token {
                backend = backend.with_auth_token(token.clone());
            }
            tracing::debug!("Using HTTP backend at {}", backend.base_url());
            Ok(StorePorts::from_backend(Arc::new(backend)))
        }
        BackendKind::Memory => {
            let backend = InMemoryBackend::new();
            if let Some(user) = &config.backend.rehearsal_user {
                backend.sign_in(UserIdentity::new(user.clone()));
                backend.seed_user(user, config.rehearsal_records());
                tracing::info!(
                    "🧪 Rehearsal backend seeded for {} ({} records per store)",
                    user,
                    config.rehearsal_records()
                );
            }
            Ok(StorePorts::from_backend(Arc::new(backend)))
        }
    }
}
