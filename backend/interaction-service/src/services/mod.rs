/// Service layer for social interactions
///
/// This module provides business logic for:
/// - Users: registration, lookup and profile edits
/// - Follow: the follow graph and its counters
/// - Content: posts, likes, comments and feeds
/// - Conversations: direct messages and per-partner summaries
/// - Notifications: creation, grouping and read state
pub mod content;
pub mod conversations;
pub mod follow;
pub mod notifications;
pub mod users;

use std::sync::Arc;

use crate::config::Limits;
use crate::store::EntityStore;

pub use content::{CommentCreated, ContentService, NewComment, NewPost};
pub use conversations::ConversationService;
pub use follow::{FollowAction, FollowService, ToggleFollowResult};
pub use notifications::{
    display_text, NewNotification, NotificationChange, NotificationOutcome, NotificationService,
    NotificationView,
};
pub use users::{NewUser, ProfileUpdate, UserService};

/// Every service over one shared store
#[derive(Clone)]
pub struct Engine {
    pub store: Arc<EntityStore>,
    pub users: UserService,
    pub follows: FollowService,
    pub content: ContentService,
    pub conversations: ConversationService,
    pub notifications: NotificationService,
}

impl Engine {
    pub fn new(store: Arc<EntityStore>, limits: Limits) -> Self {
        Self {
            users: UserService::new(store.clone(), limits),
            follows: FollowService::new(store.clone()),
            content: ContentService::new(store.clone(), limits),
            conversations: ConversationService::new(store.clone(), limits),
            notifications: NotificationService::new(store.clone()),
            store,
        }
    }
}
