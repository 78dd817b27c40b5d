use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity - profile plus derived social counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Post entity - authored content with its like set and comment counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(alias = "userId")]
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    /// Unique user ids in like order
    #[serde(default, alias = "likes")]
    pub liker_ids: Vec<String>,
    #[serde(default)]
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.liker_ids.iter().any(|id| id == user_id)
    }

    pub fn like_count(&self) -> usize {
        self.liker_ids.len()
    }
}

/// Comment entity - belongs to exactly one post, optionally replying to a
/// top-level comment on that post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    #[serde(alias = "userId")]
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, alias = "likes")]
    pub liker_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.liker_ids.iter().any(|id| id == user_id)
    }
}

/// Directed follow relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEdge {
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

impl FollowEdge {
    pub fn new(follower_id: &str, following_id: &str) -> Self {
        Self {
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Store key for the ordered (follower, following) pair
pub fn edge_key(follower_id: &str, following_id: &str) -> String {
    format!("{}->{}", follower_id, following_id)
}

/// Direct message between two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// The participant that is not `user_id`
    pub fn partner_of(&self, user_id: &str) -> &str {
        if self.sender_id == user_id {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }
}

/// Notification type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// User liked a post
    Like,
    /// User commented on a post
    Comment,
    /// User started following
    Follow,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
        }
    }

    /// Like and comment events on the same post collapse into one record
    pub fn is_groupable(&self) -> bool {
        !matches!(self, NotificationKind::Follow)
    }
}

/// Notification model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,

    /// Recipient user ID
    pub user_id: String,

    #[serde(rename = "type")]
    pub kind: NotificationKind,

    /// Target post, absent for follow notifications
    #[serde(default)]
    pub post_id: Option<String>,

    pub message: String,

    /// Most recent actor first
    pub actor_ids: Vec<String>,

    pub group_count: usize,

    #[serde(default)]
    pub is_read: bool,

    pub created_at: DateTime<Utc>,
}

/// Per-partner conversation summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub partner_id: String,
    pub last_message: Message,
    pub unread_count: usize,
}
