use crate::core::orchestrator::{DeletionOptions, FailurePolicy};
use crate::utils::error::{PurgeError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_REHEARSAL_RECORDS: usize = 3;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    pub backend: BackendConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub concurrent_dependents: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Http,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub r#type: BackendKind,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub auth_token: Option<String>,
    /// Signed-in user for the memory backend.
    pub rehearsal_user: Option<String>,
    pub rehearsal_records: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl PurgeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PurgeError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PurgeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unset variables are left in place.
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        match self.backend.r#type {
            BackendKind::Http => {
                let base_url =
                    validation::validate_required_field("backend.base_url", &self.backend.base_url)?;
                validation::validate_resolved("backend.base_url", base_url)?;
                validation::validate_url("backend.base_url", base_url)?;
            }
            BackendKind::Memory => {
                if let Some(user) = &self.backend.rehearsal_user {
                    validation::validate_non_empty_string("backend.rehearsal_user", user)?;
                }
                if let Some(records) = self.backend.rehearsal_records {
                    validation::validate_positive_number("backend.rehearsal_records", records, 1)?;
                }
            }
        }

        if let Some(timeout) = self.backend.timeout_seconds {
            validation::validate_range("backend.timeout_seconds", timeout, 1, 300)?;
        }

        if let Some(token) = &self.backend.auth_token {
            validation::validate_resolved("backend.auth_token", token)?;
            validation::validate_non_empty_string("backend.auth_token", token)?;
        }

        if let Some(level) = self.logging.as_ref().and_then(|l| l.level.as_deref()) {
            validation::validate_one_of("logging.level", level, &LOG_LEVELS)?;
        }

        Ok(())
    }

    pub fn deletion_options(&self) -> DeletionOptions {
        DeletionOptions {
            failure_policy: self.orchestrator.failure_policy,
            concurrent_dependents: self.orchestrator.concurrent_dependents,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn rehearsal_records(&self) -> usize {
        self.backend.rehearsal_records.unwrap_or(DEFAULT_REHEARSAL_RECORDS)
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl Validate for PurgeConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
