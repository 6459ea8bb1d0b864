use crate::domain::model::{DeletionStep, UserIdentity};
use crate::domain::ports::{
    CategoryStore, ContentStore, HabitStore, IdentityProvider, ProfileStore, SocialGraphStore,
};
use crate::utils::error::{PurgeError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Post {
    id: String,
    author: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Comment {
    post_id: String,
    author: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Like {
    post_id: String,
    user: String,
}

type FailureFactory = Box<dyn Fn() -> PurgeError + Send>;

#[derive(Default)]
struct BackendState {
    session: Option<UserIdentity>,
    identities: HashSet<String>,
    profiles: HashSet<String>,
    habits: HashMap<String, Vec<String>>,
    categories: HashMap<String, Vec<String>>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    likes: Vec<Like>,
    friendships: Vec<(String, String)>,
    pending_requests: Vec<(String, String)>,
    injected_failures: HashMap<DeletionStep, PurgeError>,
    persistent_failures: HashMap<DeletionStep, FailureFactory>,
    calls: Vec<DeletionStep>,
}

impl BackendState {
    /// Logs the call and returns an injected failure for it, if any.
    fn enter(&mut self, step: DeletionStep) -> Result<()> {
        self.calls.push(step);
        if let Some(err) = self.injected_failures.remove(&step) {
            return Err(err);
        }
        match self.persistent_failures.get(&step) {
            Some(make_error) => Err(make_error()),
            None => Ok(()),
        }
    }

    fn owned_post_ids(&self, user_id: &str) -> HashSet<String> {
        self.posts
            .iter()
            .filter(|p| p.author == user_id)
            .map(|p| p.id.clone())
            .collect()
    }
}

/// Process-local implementation of every store port.
///
/// Used to rehearse a deletion without touching a real backend and as a test
/// double. Deleting the identity also ends the session, so a later
/// `current_user` returns `None`.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        // state is plain data, a panic mid-update cannot leave it unusable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sign_in(&self, identity: UserIdentity) {
        let mut state = self.state();
        state.identities.insert(identity.id.clone());
        state.session = Some(identity);
    }

    pub fn sign_out(&self) {
        self.state().session = None;
    }

    /// Creates a profile plus `records` items in every dependent store for `user_id`.
    pub fn seed_user(&self, user_id: &str, records: usize) {
        let mut state = self.state();
        state.identities.insert(user_id.to_string());
        state.profiles.insert(user_id.to_string());

        for i in 0..records {
            state
                .habits
                .entry(user_id.to_string())
                .or_default()
                .push(format!("{}-habit-{}", user_id, i));
            state
                .categories
                .entry(user_id.to_string())
                .or_default()
                .push(format!("{}-category-{}", user_id, i));

            let post_id = format!("{}-post-{}", user_id, i);
            state.comments.push(Comment {
                post_id: post_id.clone(),
                author: user_id.to_string(),
            });
            state.likes.push(Like {
                post_id: post_id.clone(),
                user: user_id.to_string(),
            });
            state.posts.push(Post {
                id: post_id,
                author: user_id.to_string(),
            });

            let friend = format!("{}-friend-{}", user_id, i);
            state.friendships.push((user_id.to_string(), friend.clone()));
            state.pending_requests.push((friend, user_id.to_string()));
        }
    }

    pub fn add_post(&self, author: &str, post_id: &str) {
        self.state().posts.push(Post {
            id: post_id.to_string(),
            author: author.to_string(),
        });
    }

    pub fn add_comment(&self, author: &str, post_id: &str) {
        self.state().comments.push(Comment {
            post_id: post_id.to_string(),
            author: author.to_string(),
        });
    }

    pub fn add_like(&self, user: &str, post_id: &str) {
        self.state().likes.push(Like {
            post_id: post_id.to_string(),
            user: user.to_string(),
        });
    }

    pub fn add_friendship(&self, a: &str, b: &str) {
        self.state().friendships.push((a.to_string(), b.to_string()));
    }

    pub fn add_friend_request(&self, from: &str, to: &str) {
        self.state()
            .pending_requests
            .push((from.to_string(), to.to_string()));
    }

    /// Makes the next call for `step` fail with `error`; later calls succeed again.
    pub fn fail_next(&self, step: DeletionStep, error: PurgeError) {
        self.state().injected_failures.insert(step, error);
    }

    /// Makes every call for `step` fail until [`clear_failures`](Self::clear_failures).
    pub fn fail_always<F>(&self, step: DeletionStep, make_error: F)
    where
        F: Fn() -> PurgeError + Send + 'static,
    {
        self.state()
            .persistent_failures
            .insert(step, Box::new(make_error));
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.injected_failures.clear();
        state.persistent_failures.clear();
    }

    /// Every port call made so far, in order.
    pub fn calls(&self) -> Vec<DeletionStep> {
        self.state().calls.clone()
    }

    pub fn current_identity(&self) -> Option<UserIdentity> {
        self.state().session.clone()
    }

    pub fn has_identity(&self, user_id: &str) -> bool {
        self.state().identities.contains(user_id)
    }

    pub fn has_profile(&self, user_id: &str) -> bool {
        self.state().profiles.contains(user_id)
    }

    /// Records of any kind, profile included, that still belong to or reference `user_id`.
    pub fn remaining_records(&self, user_id: &str) -> usize {
        let state = self.state();
        let owned_posts = state.owned_post_ids(user_id);

        let habits = state.habits.get(user_id).map(Vec::len).unwrap_or(0);
        let categories = state.categories.get(user_id).map(Vec::len).unwrap_or(0);
        let posts = owned_posts.len();
        let comments = state
            .comments
            .iter()
            .filter(|c| c.author == user_id || owned_posts.contains(&c.post_id))
            .count();
        let likes = state
            .likes
            .iter()
            .filter(|l| l.user == user_id || owned_posts.contains(&l.post_id))
            .count();
        let edges = state
            .friendships
            .iter()
            .chain(state.pending_requests.iter())
            .filter(|(a, b)| a == user_id || b == user_id)
            .count();
        let profile = usize::from(state.profiles.contains(user_id));

        habits + categories + posts + comments + likes + edges + profile
    }

    /// Total content items (posts, comments, likes) across all users.
    pub fn content_count(&self) -> usize {
        let state = self.state();
        state.posts.len() + state.comments.len() + state.likes.len()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryBackend {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        Ok(self.state().session.clone())
    }

    async fn delete_current_identity(&self) -> Result<()> {
        let mut state = self.state();
        state.enter(DeletionStep::Identity)?;
        if let Some(identity) = state.session.take() {
            state.identities.remove(&identity.id);
        }
        Ok(())
    }
}

#[async_trait]
impl HabitStore for InMemoryBackend {
    async fn delete_all_for_user(&self, user_id: &str) -> Result<()> {
        let mut state = self.state();
        state.enter(DeletionStep::Habits)?;
        state.habits.remove(user_id);
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for InMemoryBackend {
    async fn delete_all_for_user(&self, user_id: &str) -> Result<()> {
        let mut state = self.state();
        state.enter(DeletionStep::Categories)?;
        state.categories.remove(user_id);
        Ok(())
    }
}

#[async_trait]
impl ContentStore for InMemoryBackend {
    async fn delete_user_content(&self, user_id: &str) -> Result<()> {
        let mut state = self.state();
        state.enter(DeletionStep::Content)?;

        let owned_posts = state.owned_post_ids(user_id);
        state
            .comments
            .retain(|c| c.author != user_id && !owned_posts.contains(&c.post_id));
        state
            .likes
            .retain(|l| l.user != user_id && !owned_posts.contains(&l.post_id));
        state.posts.retain(|p| p.author != user_id);
        Ok(())
    }
}

#[async_trait]
impl SocialGraphStore for InMemoryBackend {
    async fn delete_user_data(&self, user_id: &str) -> Result<()> {
        let mut state = self.state();
        state.enter(DeletionStep::SocialGraph)?;
        state
            .friendships
            .retain(|(a, b)| a != user_id && b != user_id);
        state
            .pending_requests
            .retain(|(from, to)| from != user_id && to != user_id);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryBackend {
    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let mut state = self.state();
        state.enter(DeletionStep::Profile)?;
        state.profiles.remove(user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deletes_are_idempotent_on_empty_state() {
        let backend = InMemoryBackend::new();

        assert!(HabitStore::delete_all_for_user(&backend, "ghost").await.is_ok());
        assert!(CategoryStore::delete_all_for_user(&backend, "ghost").await.is_ok());
        assert!(backend.delete_user_content("ghost").await.is_ok());
        assert!(backend.delete_user_data("ghost").await.is_ok());
        assert!(backend.delete_user("ghost").await.is_ok());
        assert!(backend.delete_current_identity().await.is_ok());
        assert_eq!(backend.calls().len(), 6);
    }

    #[tokio::test]
    async fn test_content_delete_removes_references_to_user_posts() {
        let backend = InMemoryBackend::new();
        backend.add_post("alice", "p1");
        backend.add_post("bob", "p2");
        backend.add_comment("bob", "p1");
        backend.add_comment("alice", "p2");
        backend.add_comment("bob", "p2");
        backend.add_like("bob", "p1");
        backend.add_like("alice", "p2");

        backend.delete_user_content("alice").await.unwrap();

        assert_eq!(backend.remaining_records("alice"), 0);
        // bob's own post and comment on it survive
        assert_eq!(backend.content_count(), 2);
    }

    #[tokio::test]
    async fn test_social_graph_delete_removes_edges_in_both_directions() {
        let backend = InMemoryBackend::new();
        backend.add_friendship("alice", "bob");
        backend.add_friendship("carol", "alice");
        backend.add_friendship("bob", "carol");
        backend.add_friend_request("dave", "alice");
        backend.add_friend_request("alice", "erin");

        backend.delete_user_data("alice").await.unwrap();

        assert_eq!(backend.remaining_records("alice"), 0);
        assert_eq!(backend.remaining_records("bob"), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let backend = InMemoryBackend::new();
        backend.seed_user("u1", 2);
        backend.fail_next(DeletionStep::Habits, PurgeError::network("timeout"));

        let first = HabitStore::delete_all_for_user(&backend, "u1").await;
        assert!(matches!(first, Err(PurgeError::NetworkError { .. })));
        assert_eq!(backend.remaining_records("u1"), 2 * 7 + 1);

        assert!(HabitStore::delete_all_for_user(&backend, "u1").await.is_ok());
        assert_eq!(backend.remaining_records("u1"), 2 * 6 + 1);
    }

    #[tokio::test]
    async fn test_persistent_failure_fires_until_cleared() {
        let backend = InMemoryBackend::new();
        backend.seed_user("u1", 1);
        backend.fail_always(DeletionStep::Profile, || {
            PurgeError::backend("profile", Some(503), "unavailable")
        });

        for _ in 0..3 {
            let attempt = backend.delete_user("u1").await;
            assert!(matches!(attempt, Err(PurgeError::BackendError { status: Some(503), .. })));
            assert!(backend.has_profile("u1"));
        }

        backend.clear_failures();
        assert!(backend.delete_user("u1").await.is_ok());
        assert!(!backend.has_profile("u1"));
        assert_eq!(backend.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_identity_delete_ends_session() {
        let backend = InMemoryBackend::new();
        backend.sign_in(UserIdentity::new("u1").with_display_name("U One"));
        assert!(backend.has_identity("u1"));

        backend.delete_current_identity().await.unwrap();

        assert!(backend.current_user().await.unwrap().is_none());
        assert!(!backend.has_identity("u1"));
    }
}
