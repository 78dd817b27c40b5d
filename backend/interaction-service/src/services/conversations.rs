use chrono::Utc;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Limits;
use crate::domain::models::{ConversationSummary, Message};
use crate::error::{ServiceError, ServiceResult};
use crate::services::content::validate_body;
use crate::store::{new_id, EntityStore};

/// Direct messages and the per-partner conversation view derived from them
#[derive(Clone)]
pub struct ConversationService {
    store: Arc<EntityStore>,
    limits: Limits,
}

impl ConversationService {
    pub fn new(store: Arc<EntityStore>, limits: Limits) -> Self {
        Self { store, limits }
    }

    pub async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: String,
    ) -> ServiceResult<Message> {
        if sender_id == receiver_id {
            return Err(ServiceError::invalid("cannot send a message to yourself"));
        }
        validate_body("message", &content, &self.limits)?;

        let message = Message {
            id: new_id(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content,
            read: false,
            created_at: Utc::now(),
        };

        let sent = self
            .store
            .write(|t| {
                t.users.get(sender_id)?;
                t.users.get(receiver_id)?;
                t.messages.insert(message.clone())?;
                Ok(message)
            })
            .await?;

        info!(
            message_id = %sent.id,
            sender = %sender_id,
            receiver = %receiver_id,
            "Sent message"
        );
        Ok(sent)
    }

    /// One summary per partner, most recently active first.
    ///
    /// `unread_count` only counts messages `user_id` received.
    pub async fn conversations(&self, user_id: &str) -> Vec<ConversationSummary> {
        let messages = self
            .store
            .read(|t| t.messages.filter_cloned(|m| m.involves(user_id)))
            .await;

        let mut buckets: HashMap<String, ConversationSummary> = HashMap::new();
        for message in messages {
            let unread = usize::from(message.receiver_id == user_id && !message.read);
            let partner_id = message.partner_of(user_id).to_string();

            match buckets.entry(partner_id) {
                Entry::Occupied(mut entry) => {
                    let summary = entry.get_mut();
                    summary.unread_count += unread;
                    if message.created_at > summary.last_message.created_at {
                        summary.last_message = message;
                    }
                }
                Entry::Vacant(entry) => {
                    let partner_id = entry.key().clone();
                    entry.insert(ConversationSummary {
                        partner_id,
                        last_message: message,
                        unread_count: unread,
                    });
                }
            }
        }

        let mut summaries: Vec<ConversationSummary> = buckets.into_values().collect();
        summaries.sort_by(|a, b| {
            b.last_message
                .created_at
                .cmp(&a.last_message.created_at)
                .then_with(|| a.partner_id.cmp(&b.partner_id))
        });

        debug!(user_id = %user_id, conversations = summaries.len(), "Listed conversations");
        summaries
    }

    /// Full history with `partner_id`, oldest first
    pub async fn conversation_with(&self, user_id: &str, partner_id: &str) -> Vec<Message> {
        let mut history = self
            .store
            .read(|t| {
                t.messages.filter_cloned(|m| {
                    (m.sender_id == user_id && m.receiver_id == partner_id)
                        || (m.sender_id == partner_id && m.receiver_id == user_id)
                })
            })
            .await;
        history.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        history
    }

    pub async fn get_message(&self, message_id: &str) -> ServiceResult<Message> {
        self.store.read(|t| t.messages.get(message_id).cloned()).await
    }

    pub async fn mark_message_read(&self, message_id: &str) -> ServiceResult<Message> {
        self.mark_read(message_id, None).await
    }

    /// Mark read on behalf of `user_id`, who must be the receiver
    pub async fn mark_message_read_for(
        &self,
        message_id: &str,
        user_id: &str,
    ) -> ServiceResult<Message> {
        self.mark_read(message_id, Some(user_id)).await
    }

    async fn mark_read(&self, message_id: &str, receiver: Option<&str>) -> ServiceResult<Message> {
        let message = self
            .store
            .write(|t| {
                let message = t.messages.get(message_id)?;
                if receiver.is_some_and(|user_id| message.receiver_id != user_id) {
                    return Err(ServiceError::invalid(
                        "only the receiver can mark a message read",
                    ));
                }
                t.messages.update(message_id, |m| m.read = true)
            })
            .await?;

        info!(message_id = %message_id, "Marked message read");
        Ok(message)
    }

    /// Mark everything `user_id` received from `partner_id` as read,
    /// returning only the messages that changed
    pub async fn mark_conversation_read(
        &self,
        user_id: &str,
        partner_id: &str,
    ) -> ServiceResult<Vec<Message>> {
        let changed = self
            .store
            .write(|t| {
                t.users.get(user_id)?;
                let mut changed = Vec::new();
                for message in t.messages.iter_mut() {
                    if message.receiver_id == user_id
                        && message.sender_id == partner_id
                        && !message.read
                    {
                        message.read = true;
                        changed.push(message.clone());
                    }
                }
                Ok(changed)
            })
            .await?;

        info!(
            user_id = %user_id,
            partner_id = %partner_id,
            changed = changed.len(),
            "Marked conversation read"
        );
        Ok(changed)
    }
}
