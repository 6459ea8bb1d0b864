use crate::domain::model::UserIdentity;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

// Every delete below must succeed when the user has nothing left in that store.

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when there is no signed-in user.
    async fn current_user(&self) -> Result<Option<UserIdentity>>;
    async fn delete_current_identity(&self) -> Result<()>;
}

#[async_trait]
pub trait HabitStore: Send + Sync {
    async fn delete_all_for_user(&self, user_id: &str) -> Result<()>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn delete_all_for_user(&self, user_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Posts, comments and likes owned by or referencing the user.
    async fn delete_user_content(&self, user_id: &str) -> Result<()>;
}

#[async_trait]
pub trait SocialGraphStore: Send + Sync {
    /// Relationship edges and pending requests involving the user.
    async fn delete_user_data(&self, user_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn delete_user(&self, user_id: &str) -> Result<()>;
}

/// The six collaborators the deletion orchestrator is built from.
#[derive(Clone)]
pub struct StorePorts {
    pub identity: Arc<dyn IdentityProvider>,
    pub habits: Arc<dyn HabitStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub content: Arc<dyn ContentStore>,
    pub social_graph: Arc<dyn SocialGraphStore>,
    pub profile: Arc<dyn ProfileStore>,
}

impl StorePorts {
    /// Uses one backend for every port.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: IdentityProvider
            + HabitStore
            + CategoryStore
            + ContentStore
            + SocialGraphStore
            + ProfileStore
            + 'static,
    {
        Self {
            identity: backend.clone(),
            habits: backend.clone(),
            categories: backend.clone(),
            content: backend.clone(),
            social_graph: backend.clone(),
            profile: backend,
        }
    }
}
