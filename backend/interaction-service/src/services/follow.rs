use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::models::{edge_key, FollowEdge, User};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{EntityStore, Tables};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowAction {
    Followed,
    Unfollowed,
}

/// Authoritative state after a follow toggle: the edge (if it now exists)
/// and both user records with their updated counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFollowResult {
    pub action: FollowAction,
    pub edge: Option<FollowEdge>,
    pub follower: User,
    pub following: User,
}

#[derive(Clone)]
pub struct FollowService {
    store: Arc<EntityStore>,
}

impl FollowService {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Create the edge if absent, remove it if present.
    ///
    /// The edge and both counters change in one critical section.
    pub async fn toggle_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> ServiceResult<ToggleFollowResult> {
        if follower_id == following_id {
            return Err(ServiceError::invalid("users cannot follow themselves"));
        }

        let result = self
            .store
            .write(|t| {
                t.users.get(follower_id)?;
                t.users.get(following_id)?;

                let key = edge_key(follower_id, following_id);
                let (action, edge, delta) = if t.follows.contains(&key) {
                    t.follows.remove(&key)?;
                    (FollowAction::Unfollowed, None, -1)
                } else {
                    let edge = FollowEdge::new(follower_id, following_id);
                    t.follows.insert(edge.clone())?;
                    (FollowAction::Followed, Some(edge), 1)
                };

                let follower = t
                    .users
                    .update(follower_id, |u| u.following_count += delta)?;
                let following = t
                    .users
                    .update(following_id, |u| u.followers_count += delta)?;

                Ok(ToggleFollowResult {
                    action,
                    edge,
                    follower,
                    following,
                })
            })
            .await?;

        info!(
            follower = %follower_id,
            following = %following_id,
            action = ?result.action,
            "Toggled follow"
        );
        Ok(result)
    }

    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> bool {
        let key = edge_key(follower_id, following_id);
        self.store.read(|t| t.follows.contains(&key)).await
    }

    /// Users that `user_id` follows
    pub async fn following_ids(&self, user_id: &str) -> HashSet<String> {
        self.store
            .read(|t| Self::following_ids_in(t, user_id))
            .await
    }

    /// Same as [`FollowService::following_ids`], evaluated inside a caller's
    /// read section so feed assembly sees one snapshot
    pub(crate) fn following_ids_in(t: &Tables, user_id: &str) -> HashSet<String> {
        t.follows
            .iter()
            .filter(|e| e.follower_id == user_id)
            .map(|e| e.following_id.clone())
            .collect()
    }

    /// Users that follow `user_id`
    pub async fn follower_ids(&self, user_id: &str) -> HashSet<String> {
        self.store
            .read(|t| {
                t.follows
                    .iter()
                    .filter(|e| e.following_id == user_id)
                    .map(|e| e.follower_id.clone())
                    .collect()
            })
            .await
    }

    /// Edges pointing at `user_id`, oldest first
    pub async fn followers_of(&self, user_id: &str) -> ServiceResult<Vec<FollowEdge>> {
        let edges = self
            .store
            .read(|t| {
                t.users.get(user_id)?;
                Ok(t.follows.filter_cloned(|e| e.following_id == user_id))
            })
            .await?;
        debug!(user_id = %user_id, count = edges.len(), "Listed followers");
        Ok(edges)
    }

    /// Edges leaving `user_id`, oldest first
    pub async fn following_of(&self, user_id: &str) -> ServiceResult<Vec<FollowEdge>> {
        let edges = self
            .store
            .read(|t| {
                t.users.get(user_id)?;
                Ok(t.follows.filter_cloned(|e| e.follower_id == user_id))
            })
            .await?;
        debug!(user_id = %user_id, count = edges.len(), "Listed following");
        Ok(edges)
    }
}
