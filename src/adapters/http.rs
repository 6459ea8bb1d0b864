use crate::domain::model::{DeletionStep, UserIdentity};
use crate::domain::ports::{
    CategoryStore, ContentStore, HabitStore, IdentityProvider, ProfileStore, SocialGraphStore,
};
use crate::utils::error::{PurgeError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Store ports backed by a REST account API.
///
/// Routes, relative to the base URL:
///
/// - `GET session` returns the signed-in [`UserIdentity`] (401/404 when there is none)
/// - `DELETE users/{id}/habits|categories|content|social-graph|profile`
/// - `DELETE session/identity`
///
/// A 404 on a delete is treated as success, so repeating a delete is harmless.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| PurgeError::InvalidConfigValueError {
            field: "backend.base_url".to_string(),
            value: base_url.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        // Url::join drops the last segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            auth_token: None,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| PurgeError::ConfigError {
            message: format!("Cannot build endpoint '{}': {}", path, e),
        })
    }

    fn user_endpoint(&self, user_id: &str, collection: &str) -> Result<Url> {
        let mut url = self.endpoint("users/")?;
        url.path_segments_mut()
            .map_err(|_| PurgeError::ConfigError {
                message: "backend.base_url cannot be a base URL".to_string(),
            })?
            .pop_if_empty()
            .push(user_id)
            .push(collection);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn delete(&self, step: DeletionStep, url: Url) -> Result<()> {
        tracing::debug!("Sending DELETE {}", url);
        let response = self
            .authorize(self.client.delete(url))
            .send()
            .await
            .map_err(|e| transport_error(step, e))?;

        let status = response.status();
        tracing::debug!("{} store responded with {}", step, status);

        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PurgeError::backend(
            step.as_str(),
            Some(status.as_u16()),
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            },
        ))
    }
}

fn transport_error(step: DeletionStep, e: reqwest::Error) -> PurgeError {
    if e.is_timeout() || e.is_connect() {
        PurgeError::network(format!("{} store unreachable: {}", step, e))
    } else {
        PurgeError::ApiError(e)
    }
}

#[async_trait]
impl IdentityProvider for HttpBackend {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        let url = self.endpoint("session")?;
        tracing::debug!("Resolving current user from {}", url);

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| transport_error(DeletionStep::Identity, e))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let identity: UserIdentity = response.json().await?;
                if identity.id.trim().is_empty() {
                    return Err(PurgeError::InvalidIdentity {
                        reason: "session returned a blank user id".to_string(),
                    });
                }
                Ok(Some(identity))
            }
            status => Err(PurgeError::backend(
                "session",
                Some(status.as_u16()),
                response.text().await.unwrap_or_default(),
            )),
        }
    }

    async fn delete_current_identity(&self) -> Result<()> {
        let url = self.endpoint("session/identity")?;
        self.delete(DeletionStep::Identity, url).await
    }
}

#[async_trait]
impl HabitStore for HttpBackend {
    async fn delete_all_for_user(&self, user_id: &str) -> Result<()> {
        let url = self.user_endpoint(user_id, "habits")?;
        self.delete(DeletionStep::Habits, url).await
    }
}

#[async_trait]
impl CategoryStore for HttpBackend {
    async fn delete_all_for_user(&self, user_id: &str) -> Result<()> {
        let url = self.user_endpoint(user_id, "categories")?;
        self.delete(DeletionStep::Categories, url).await
    }
}

#[async_trait]
impl ContentStore for HttpBackend {
    async fn delete_user_content(&self, user_id: &str) -> Result<()> {
        let url = self.user_endpoint(user_id, "content")?;
        self.delete(DeletionStep::Content, url).await
    }
}

#[async_trait]
impl SocialGraphStore for HttpBackend {
    async fn delete_user_data(&self, user_id: &str) -> Result<()> {
        let url = self.user_endpoint(user_id, "social-graph")?;
        self.delete(DeletionStep::SocialGraph, url).await
    }
}

#[async_trait]
impl ProfileStore for HttpBackend {
    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let url = self.user_endpoint(user_id, "profile")?;
        self.delete(DeletionStep::Profile, url).await
    }
}
