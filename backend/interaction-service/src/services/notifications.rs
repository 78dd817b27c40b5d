/// Notification aggregation engine
///
/// Like and comment notifications on the same post are grouped while the
/// recipient has not read them:
/// 1. Look for an unread notification with the same (recipient, kind, post)
/// 2. New actor: prepend it, refresh `created_at`, keep `group_count` in
///    step with `actor_ids`
/// 3. Known actor: return the record untouched
/// 4. Nothing to group with: create a fresh record
///
/// Follow notifications are never grouped.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::models::{Notification, NotificationKind};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{new_id, EntityStore};

/// Request to record a notification event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    /// Recipient
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub post_id: Option<String>,
    pub actor_id: String,
    pub message: String,
}

impl NewNotification {
    pub fn validate(&self) -> ServiceResult<()> {
        if self.actor_id.trim().is_empty() {
            return Err(ServiceError::invalid("actor id must not be empty"));
        }
        if self.message.trim().is_empty() {
            return Err(ServiceError::invalid("notification message must not be empty"));
        }
        match (self.kind, &self.post_id) {
            (NotificationKind::Follow, Some(_)) => Err(ServiceError::invalid(
                "follow notifications do not reference a post",
            )),
            (NotificationKind::Like | NotificationKind::Comment, None) => Err(
                ServiceError::invalid(format!("{} notifications need a post id", self.kind.as_str())),
            ),
            _ => Ok(()),
        }
    }
}

/// What `create_notification` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChange {
    /// A new unread record was stored
    Created,
    /// A new actor joined an existing unread record
    Grouped,
    /// The actor was already part of the group
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOutcome {
    pub notification: Notification,
    pub change: NotificationChange,
}

impl NotificationOutcome {
    /// Whether a new unread record appeared
    pub fn created(&self) -> bool {
        self.change == NotificationChange::Created
    }
}

/// Notification plus its rendered sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub display_text: String,
}

fn ensure_recipient(notification: &Notification, recipient: Option<&str>) -> ServiceResult<()> {
    match recipient {
        Some(user_id) if notification.user_id != user_id => Err(ServiceError::invalid(
            "notification belongs to another user",
        )),
        _ => Ok(()),
    }
}

/// Render the grouped sentence, e.g. "Ana and 2 others liked your post".
///
/// `actor_name` maps an actor id to the name shown for it.
pub fn display_text<F>(notification: &Notification, actor_name: F) -> String
where
    F: Fn(&str) -> String,
{
    let first = notification
        .actor_ids
        .first()
        .map(|id| actor_name(id))
        .unwrap_or_else(|| "Someone".to_string());

    match notification.group_count {
        0 | 1 => format!("{} {}", first, notification.message),
        2 => {
            let second = notification
                .actor_ids
                .get(1)
                .map(|id| actor_name(id))
                .unwrap_or_else(|| "someone".to_string());
            format!("{} and {} {}", first, second, notification.message)
        }
        n => format!("{} and {} others {}", first, n - 1, notification.message),
    }
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<EntityStore>,
}

impl NotificationService {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    pub async fn create_notification(
        &self,
        req: NewNotification,
    ) -> ServiceResult<NotificationOutcome> {
        req.validate()?;

        let outcome = self
            .store
            .write(|t| {
                t.users.get(&req.user_id)?;
                if let Some(post_id) = &req.post_id {
                    t.posts.get(post_id)?;
                }

                if req.kind.is_groupable() {
                    let existing = t
                        .notifications
                        .iter()
                        .rev()
                        .find(|n| {
                            !n.is_read
                                && n.user_id == req.user_id
                                && n.kind == req.kind
                                && n.post_id == req.post_id
                        })
                        .map(|n| n.id.clone());

                    if let Some(id) = existing {
                        let current = t.notifications.get(&id)?;
                        if current.actor_ids.contains(&req.actor_id) {
                            return Ok(NotificationOutcome {
                                notification: current.clone(),
                                change: NotificationChange::Unchanged,
                            });
                        }

                        let notification = t.notifications.update(&id, |n| {
                            n.actor_ids.insert(0, req.actor_id.clone());
                            n.group_count = n.actor_ids.len();
                            n.created_at = Utc::now();
                        })?;
                        return Ok(NotificationOutcome {
                            notification,
                            change: NotificationChange::Grouped,
                        });
                    }
                }

                let notification = Notification {
                    id: new_id(),
                    user_id: req.user_id.clone(),
                    kind: req.kind,
                    post_id: req.post_id.clone(),
                    message: req.message.clone(),
                    actor_ids: vec![req.actor_id.clone()],
                    group_count: 1,
                    is_read: false,
                    created_at: Utc::now(),
                };
                t.notifications.insert(notification.clone())?;
                Ok(NotificationOutcome {
                    notification,
                    change: NotificationChange::Created,
                })
            })
            .await?;

        info!(
            notification_id = %outcome.notification.id,
            recipient = %req.user_id,
            kind = req.kind.as_str(),
            actor = %req.actor_id,
            group_count = outcome.notification.group_count,
            change = ?outcome.change,
            "Recorded notification"
        );
        Ok(outcome)
    }

    pub async fn get_notification(&self, notification_id: &str) -> ServiceResult<Notification> {
        self.store
            .read(|t| t.notifications.get(notification_id).cloned())
            .await
    }

    /// Notifications addressed to `user_id`, newest first
    pub async fn notifications_for(&self, user_id: &str) -> Vec<Notification> {
        let mut notifications = self
            .store
            .read(|t| t.notifications.filter_cloned(|n| n.user_id == user_id))
            .await;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(user_id = %user_id, count = notifications.len(), "Listed notifications");
        notifications
    }

    pub async fn unread_count(&self, user_id: &str) -> usize {
        self.store
            .read(|t| {
                t.notifications
                    .iter()
                    .filter(|n| n.user_id == user_id && !n.is_read)
                    .count()
            })
            .await
    }

    pub async fn mark_as_read(&self, notification_id: &str) -> ServiceResult<Notification> {
        self.mark_read(notification_id, None).await
    }

    /// Mark read on behalf of `user_id`, who must be the recipient
    pub async fn mark_as_read_for(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> ServiceResult<Notification> {
        self.mark_read(notification_id, Some(user_id)).await
    }

    async fn mark_read(
        &self,
        notification_id: &str,
        recipient: Option<&str>,
    ) -> ServiceResult<Notification> {
        let notification = self
            .store
            .write(|t| {
                ensure_recipient(t.notifications.get(notification_id)?, recipient)?;
                t.notifications.update(notification_id, |n| n.is_read = true)
            })
            .await?;

        info!(notification_id = %notification_id, "Marked notification read");
        Ok(notification)
    }

    /// Returns only the notifications that were unread before the call
    pub async fn mark_all_as_read(&self, user_id: &str) -> ServiceResult<Vec<Notification>> {
        let changed = self
            .store
            .write(|t| {
                t.users.get(user_id)?;
                let mut changed = Vec::new();
                for notification in t.notifications.iter_mut() {
                    if notification.user_id == user_id && !notification.is_read {
                        notification.is_read = true;
                        changed.push(notification.clone());
                    }
                }
                Ok(changed)
            })
            .await?;

        info!(user_id = %user_id, changed = changed.len(), "Marked all notifications read");
        Ok(changed)
    }

    pub async fn delete_notification(&self, notification_id: &str) -> ServiceResult<Notification> {
        self.remove(notification_id, None).await
    }

    /// Delete on behalf of `user_id`, who must be the recipient
    pub async fn delete_notification_for(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> ServiceResult<Notification> {
        self.remove(notification_id, Some(user_id)).await
    }

    async fn remove(
        &self,
        notification_id: &str,
        recipient: Option<&str>,
    ) -> ServiceResult<Notification> {
        let removed = self
            .store
            .write(|t| {
                ensure_recipient(t.notifications.get(notification_id)?, recipient)?;
                t.notifications.remove(notification_id)
            })
            .await?;

        info!(notification_id = %notification_id, "Deleted notification");
        Ok(removed)
    }

    /// Attach rendered text, resolving actor ids to display names
    pub async fn describe(&self, notifications: Vec<Notification>) -> Vec<NotificationView> {
        self.store
            .read(|t| {
                notifications
                    .into_iter()
                    .map(|notification| {
                        let display_text = display_text(&notification, |id| {
                            t.users
                                .get(id)
                                .map(|u| u.display_name.clone())
                                .unwrap_or_else(|_| id.to_string())
                        });
                        NotificationView {
                            notification,
                            display_text,
                        }
                    })
                    .collect()
            })
            .await
    }
}
