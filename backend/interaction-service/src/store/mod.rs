//! In-memory entity store
//!
//! Holds the canonical collections behind a single `RwLock`. Every mutation
//! runs inside one write critical section, which makes cross-entity updates
//! (a follow edge plus both user counters, a comment plus its post counter)
//! atomic from the caller's point of view. Readers share the read lock and
//! always observe a fully-applied state.
//!
//! Closures passed to [`EntityStore::write`] must finish every fallible
//! lookup before they mutate anything, so an `Err` never leaves a partial
//! update behind.

pub mod collection;
pub mod seed;

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::domain::models::{Comment, FollowEdge, Message, Notification, Post, User};
use crate::error::{ServiceError, ServiceResult};

pub use collection::{Collection, Entity};
pub use seed::SeedData;

/// Canonical collections
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub users: Collection<User>,
    pub posts: Collection<Post>,
    pub comments: Collection<Comment>,
    pub follows: Collection<FollowEdge>,
    pub messages: Collection<Message>,
    pub notifications: Collection<Notification>,
}

impl Tables {
    /// Rebuild every derived counter from the collections.
    fn recompute_counters(&mut self) {
        let mut posts_by_author: HashMap<String, i64> = HashMap::new();
        for post in self.posts.iter() {
            *posts_by_author.entry(post.author_id.clone()).or_default() += 1;
        }

        let mut followers: HashMap<String, i64> = HashMap::new();
        let mut following: HashMap<String, i64> = HashMap::new();
        for edge in self.follows.iter() {
            *following.entry(edge.follower_id.clone()).or_default() += 1;
            *followers.entry(edge.following_id.clone()).or_default() += 1;
        }

        for user in self.users.iter_mut() {
            user.posts_count = posts_by_author.get(&user.id).copied().unwrap_or(0);
            user.followers_count = followers.get(&user.id).copied().unwrap_or(0);
            user.following_count = following.get(&user.id).copied().unwrap_or(0);
        }

        let mut comments_by_post: HashMap<String, i64> = HashMap::new();
        for comment in self.comments.iter() {
            *comments_by_post.entry(comment.post_id.clone()).or_default() += 1;
        }
        for post in self.posts.iter_mut() {
            post.comments_count = comments_by_post.get(&post.id).copied().unwrap_or(0);
        }

        for notification in self.notifications.iter_mut() {
            notification.group_count = notification.actor_ids.len();
        }
    }
}

/// Collection sizes, exposed on the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
    pub follows: usize,
    pub messages: usize,
    pub notifications: usize,
}

/// Shared handle to the canonical collections
#[derive(Debug, Default)]
pub struct EntityStore {
    tables: RwLock<Tables>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from seed data, validating references and rebuilding
    /// derived counters so the engine starts consistent.
    pub fn from_seed(seed: SeedData) -> ServiceResult<Self> {
        let mut tables = Tables::default();

        for user in seed.users {
            if tables.users.iter().any(|u| u.username == user.username) {
                return Err(ServiceError::Conflict(format!(
                    "username {} already taken",
                    user.username
                )));
            }
            tables.users.insert(user)?;
        }

        for post in seed.posts {
            tables.users.get(&post.author_id)?;
            ensure_distinct("post", &post.id, "liker", &post.liker_ids)?;
            tables.posts.insert(post)?;
        }

        for comment in seed.comments {
            tables.posts.get(&comment.post_id)?;
            ensure_distinct("comment", &comment.id, "liker", &comment.liker_ids)?;
            tables.comments.insert(comment)?;
        }

        // Parents may appear after their replies in the seed file
        for comment in tables.comments.iter() {
            let Some(parent_id) = &comment.parent_id else {
                continue;
            };
            let parent = tables.comments.get(parent_id)?;
            if parent.post_id != comment.post_id || parent.is_reply() {
                return Err(ServiceError::invalid(format!(
                    "comment {} must reply to a top-level comment on post {}",
                    comment.id, comment.post_id
                )));
            }
        }

        for edge in seed.follows {
            if edge.follower_id == edge.following_id {
                return Err(ServiceError::invalid(format!(
                    "user {} cannot follow themselves",
                    edge.follower_id
                )));
            }
            tables.users.get(&edge.follower_id)?;
            tables.users.get(&edge.following_id)?;
            tables.follows.insert(edge)?;
        }

        for message in seed.messages {
            tables.users.get(&message.sender_id)?;
            tables.users.get(&message.receiver_id)?;
            tables.messages.insert(message)?;
        }

        for notification in seed.notifications {
            tables.users.get(&notification.user_id)?;
            for actor_id in &notification.actor_ids {
                tables.users.get(actor_id)?;
            }
            ensure_distinct(
                "notification",
                &notification.id,
                "actor",
                &notification.actor_ids,
            )?;
            tables.notifications.insert(notification)?;
        }

        tables.recompute_counters();

        info!(
            users = tables.users.len(),
            posts = tables.posts.len(),
            comments = tables.comments.len(),
            follows = tables.follows.len(),
            messages = tables.messages.len(),
            notifications = tables.notifications.len(),
            "Entity store seeded"
        );

        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    /// Run `f` against a consistent snapshot
    pub async fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&Tables) -> R,
    {
        let tables = self.tables.read().await;
        f(&tables)
    }

    /// Run `f` as a single critical section
    pub async fn write<R, F>(&self, f: F) -> ServiceResult<R>
    where
        F: FnOnce(&mut Tables) -> ServiceResult<R>,
    {
        let mut tables = self.tables.write().await;
        f(&mut tables)
    }

    pub async fn stats(&self) -> StoreStats {
        self.read(|t| StoreStats {
            users: t.users.len(),
            posts: t.posts.len(),
            comments: t.comments.len(),
            follows: t.follows.len(),
            messages: t.messages.len(),
            notifications: t.notifications.len(),
        })
        .await
    }
}

/// Reject a seeded id list that names the same user twice
fn ensure_distinct(kind: &str, id: &str, role: &str, user_ids: &[String]) -> ServiceResult<()> {
    let mut seen = HashSet::with_capacity(user_ids.len());
    if let Some(dup) = user_ids.iter().find(|user_id| !seen.insert(user_id.as_str())) {
        return Err(ServiceError::invalid(format!(
            "{} {} lists {} {} more than once",
            kind, id, role, dup
        )));
    }
    Ok(())
}

/// Identifier for a newly created entity
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::NotificationKind;
    use chrono::Utc;

    fn user(id: &str, username: &str) -> User {
        User {
            id: id.to_string(),
            username: username.to_string(),
            display_name: username.to_uppercase(),
            bio: String::new(),
            avatar: None,
            website: String::new(),
            location: String::new(),
            posts_count: 99,
            followers_count: 99,
            following_count: 99,
            created_at: Utc::now(),
        }
    }

    fn post(id: &str, author: &str) -> Post {
        Post {
            id: id.to_string(),
            author_id: author.to_string(),
            content: "seeded".into(),
            media_urls: vec![],
            liker_ids: vec![],
            comments_count: 42,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_from_seed_recomputes_counters() {
        let seed = SeedData {
            users: vec![user("1", "ana"), user("2", "bo")],
            posts: vec![post("p1", "2"), post("p2", "2")],
            comments: vec![Comment {
                id: "c1".into(),
                post_id: "p1".into(),
                author_id: "1".into(),
                content: "nice".into(),
                parent_id: None,
                liker_ids: vec![],
                created_at: Utc::now(),
            }],
            follows: vec![FollowEdge::new("1", "2")],
            ..Default::default()
        };

        let store = EntityStore::from_seed(seed).unwrap();

        store
            .read(|t| {
                let ana = t.users.get("1").unwrap();
                let bo = t.users.get("2").unwrap();
                assert_eq!(ana.following_count, 1);
                assert_eq!(ana.followers_count, 0);
                assert_eq!(ana.posts_count, 0);
                assert_eq!(bo.followers_count, 1);
                assert_eq!(bo.posts_count, 2);
                assert_eq!(t.posts.get("p1").unwrap().comments_count, 1);
                assert_eq!(t.posts.get("p2").unwrap().comments_count, 0);
            })
            .await;

        let stats = store.stats().await;
        assert_eq!(stats.users, 2);
        assert_eq!(stats.posts, 2);
        assert_eq!(stats.follows, 1);
    }

    #[test]
    fn test_from_seed_rejects_self_follow() {
        let seed = SeedData {
            users: vec![user("1", "ana")],
            follows: vec![FollowEdge::new("1", "1")],
            ..Default::default()
        };

        let err = EntityStore::from_seed(seed).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[test]
    fn test_from_seed_rejects_duplicate_username() {
        let seed = SeedData {
            users: vec![user("1", "ana"), user("2", "ana")],
            ..Default::default()
        };

        let err = EntityStore::from_seed(seed).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    fn comment(id: &str, post_id: &str, parent_id: Option<&str>) -> Comment {
        Comment {
            id: id.to_string(),
            post_id: post_id.to_string(),
            author_id: "1".into(),
            content: "seeded".into(),
            parent_id: parent_id.map(str::to_string),
            liker_ids: vec![],
            created_at: Utc::now(),
        }
    }

    fn invalid_seed(seed: SeedData) -> bool {
        matches!(
            EntityStore::from_seed(seed),
            Err(ServiceError::InvalidArgument(_))
        )
    }

    #[test]
    fn test_from_seed_rejects_repeated_likers() {
        let mut liked_twice = post("p1", "1");
        liked_twice.liker_ids = vec!["1".into(), "1".into()];
        assert!(invalid_seed(SeedData {
            users: vec![user("1", "ana")],
            posts: vec![liked_twice],
            ..Default::default()
        }));

        let mut reply = comment("c1", "p1", None);
        reply.liker_ids = vec!["2".into(), "1".into(), "2".into()];
        assert!(invalid_seed(SeedData {
            users: vec![user("1", "ana"), user("2", "bo")],
            posts: vec![post("p1", "1")],
            comments: vec![reply],
            ..Default::default()
        }));
    }

    #[tokio::test]
    async fn test_seeded_like_unlikes_in_one_toggle() {
        let mut liked = post("p1", "1");
        liked.liker_ids = vec!["2".into()];
        let store = EntityStore::from_seed(SeedData {
            users: vec![user("1", "ana"), user("2", "bo")],
            posts: vec![liked],
            ..Default::default()
        })
        .unwrap();

        let engine = crate::services::Engine::new(
            std::sync::Arc::new(store),
            crate::config::Limits::default(),
        );
        let unliked = engine.content.toggle_like("p1", "2").await.unwrap();
        assert!(!unliked.is_liked_by("2"));
    }

    #[test]
    fn test_from_seed_checks_reply_parents() {
        let users = vec![user("1", "ana")];
        let posts = vec![post("p1", "1"), post("p2", "1")];

        // reply listed before its parent is fine
        let store = EntityStore::from_seed(SeedData {
            users: users.clone(),
            posts: posts.clone(),
            comments: vec![comment("r1", "p1", Some("c1")), comment("c1", "p1", None)],
            ..Default::default()
        });
        assert!(store.is_ok());

        assert!(invalid_seed(SeedData {
            users: users.clone(),
            posts: posts.clone(),
            comments: vec![comment("c1", "p1", None), comment("r1", "p2", Some("c1"))],
            ..Default::default()
        }));

        assert!(invalid_seed(SeedData {
            users: users.clone(),
            posts: posts.clone(),
            comments: vec![
                comment("c1", "p1", None),
                comment("r1", "p1", Some("c1")),
                comment("r2", "p1", Some("r1")),
            ],
            ..Default::default()
        }));

        let err = EntityStore::from_seed(SeedData {
            users,
            posts,
            comments: vec![comment("r1", "p1", Some("gone"))],
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_from_seed_checks_message_participants() {
        let err = EntityStore::from_seed(SeedData {
            users: vec![user("1", "ana")],
            messages: vec![Message {
                id: "m1".into(),
                sender_id: "1".into(),
                receiver_id: "ghost".into(),
                content: "hi".into(),
                read: false,
                created_at: Utc::now(),
            }],
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_from_seed_checks_notification_users() {
        let notification = |user_id: &str, actor_ids: &[&str]| Notification {
            id: "n1".into(),
            user_id: user_id.to_string(),
            kind: NotificationKind::Like,
            post_id: Some("p1".into()),
            message: "liked your post".into(),
            actor_ids: actor_ids.iter().map(|id| id.to_string()).collect(),
            group_count: 0,
            is_read: false,
            created_at: Utc::now(),
        };
        let seed = |n: Notification| SeedData {
            users: vec![user("1", "ana"), user("2", "bo")],
            posts: vec![post("p1", "1")],
            notifications: vec![n],
            ..Default::default()
        };

        assert!(EntityStore::from_seed(seed(notification("ghost", &["2"])))
            .unwrap_err()
            .is_not_found());
        assert!(EntityStore::from_seed(seed(notification("1", &["ghost"])))
            .unwrap_err()
            .is_not_found());
        assert!(invalid_seed(seed(notification("1", &["2", "2"]))));

        let store = EntityStore::from_seed(seed(notification("1", &["2"]))).unwrap();
        let group_count = store
            .read(|t| t.notifications.get("n1").map(|n| n.group_count))
            .await
            .unwrap();
        assert_eq!(group_count, 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_untouched() {
        let store = EntityStore::new();

        let result: ServiceResult<()> = store
            .write(|t| {
                t.users.get("ghost")?;
                t.users.insert(user("1", "ana"))
            })
            .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(store.stats().await.users, 0);
    }
}
