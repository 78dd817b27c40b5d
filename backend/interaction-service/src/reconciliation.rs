//! Optimistic updates against the engine
//!
//! A caller that wants instant feedback applies a speculative value, calls
//! the engine, then either replaces its state with the authoritative entity
//! the engine returned or reverts to what it had before. [`Optimistic`]
//! packages that sequence; [`SocialClient`] is a caller built on it.

use std::future::Future;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::models::{Comment, NotificationKind, Post, User};
use crate::error::{ServiceError, ServiceResult};
use crate::services::{Engine, FollowAction, NewComment, NewNotification, NotificationView};

const LIKE_MESSAGE: &str = "liked your post";
const COMMENT_MESSAGE: &str = "commented on your post";
const FOLLOW_MESSAGE: &str = "started following you";

/// Caller-side copy of an entity that may run ahead of the engine.
///
/// `confirmed` only ever holds values the engine returned. Observers
/// subscribed through [`Optimistic::subscribe`] also see the speculative
/// value while a call is in flight.
#[derive(Debug)]
pub struct Optimistic<T> {
    confirmed: T,
    view: watch::Sender<T>,
}

impl<T: Clone> Optimistic<T> {
    pub fn new(value: T) -> Self {
        let (view, _) = watch::channel(value.clone());
        Self {
            confirmed: value,
            view,
        }
    }

    /// Value to display right now, speculative or confirmed
    pub fn current(&self) -> T {
        self.view.borrow().clone()
    }

    pub fn confirmed(&self) -> &T {
        &self.confirmed
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.view.subscribe()
    }

    /// Replace both views with a freshly read value
    pub fn refresh(&mut self, value: T) {
        self.view.send_replace(value.clone());
        self.confirmed = value;
    }

    /// Apply `speculate` to the confirmed value, run `call`, then replace
    /// with its result or revert to the pre-call value on error.
    pub async fn mutate<S, C, Fut, E>(&mut self, speculate: S, call: C) -> Result<T, E>
    where
        S: FnOnce(&T) -> T,
        C: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let speculative = speculate(&self.confirmed);
        self.view.send_replace(speculative);

        match call().await {
            Ok(authoritative) => {
                self.refresh(authoritative.clone());
                Ok(authoritative)
            }
            Err(err) => {
                self.view.send_replace(self.confirmed.clone());
                Err(err)
            }
        }
    }

    pub fn into_inner(self) -> T {
        self.confirmed
    }
}

/// A user as seen by the viewer, with the follow relation between them
#[derive(Debug, Clone, PartialEq)]
pub struct FollowView {
    pub user: User,
    pub is_following: bool,
}

/// Engine caller acting as one user
#[derive(Clone)]
pub struct SocialClient {
    engine: Engine,
    viewer: String,
}

impl SocialClient {
    pub fn new(engine: Engine, viewer: impl Into<String>) -> Self {
        Self {
            engine,
            viewer: viewer.into(),
        }
    }

    pub fn viewer(&self) -> &str {
        &self.viewer
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub async fn post(&self, post_id: &str) -> ServiceResult<Optimistic<Post>> {
        Ok(Optimistic::new(self.engine.content.get_post(post_id).await?))
    }

    pub async fn comment_state(&self, comment_id: &str) -> ServiceResult<Optimistic<Comment>> {
        Ok(Optimistic::new(self.engine.content.get_comment(comment_id).await?))
    }

    pub async fn follow_view(&self, user_id: &str) -> ServiceResult<Optimistic<FollowView>> {
        let user = self.engine.users.get_user(user_id).await?;
        let is_following = self.engine.follows.is_following(&self.viewer, user_id).await;
        Ok(Optimistic::new(FollowView { user, is_following }))
    }

    /// Toggle the viewer's like and notify the author when it became a like
    pub async fn like_post(&self, post: &mut Optimistic<Post>) -> ServiceResult<Post> {
        let post_id = post.confirmed().id.clone();
        let viewer = self.viewer.as_str();
        let content = &self.engine.content;

        let updated = post
            .mutate(
                |p| {
                    let mut next = p.clone();
                    if next.is_liked_by(viewer) {
                        next.liker_ids.retain(|id| id != viewer);
                    } else {
                        next.liker_ids.push(viewer.to_string());
                    }
                    next
                },
                || content.toggle_like(&post_id, viewer),
            )
            .await?;

        if updated.is_liked_by(viewer) {
            self.notify(
                &updated.author_id,
                NotificationKind::Like,
                Some(updated.id.as_str()),
                LIKE_MESSAGE,
            )
            .await;
        }
        Ok(updated)
    }

    pub async fn like_comment(&self, comment: &mut Optimistic<Comment>) -> ServiceResult<Comment> {
        let comment_id = comment.confirmed().id.clone();
        let viewer = self.viewer.as_str();
        let content = &self.engine.content;

        comment
            .mutate(
                |c| {
                    let mut next = c.clone();
                    if next.is_liked_by(viewer) {
                        next.liker_ids.retain(|id| id != viewer);
                    } else {
                        next.liker_ids.push(viewer.to_string());
                    }
                    next
                },
                || content.toggle_comment_like(&comment_id, viewer),
            )
            .await
    }

    /// Toggle the viewer's follow of `target` and notify on a new follow
    pub async fn follow_user(&self, target: &mut Optimistic<FollowView>) -> ServiceResult<FollowView> {
        let target_id = target.confirmed().user.id.clone();
        let viewer = self.viewer.as_str();
        let follows = &self.engine.follows;

        let updated = target
            .mutate(
                |v| {
                    let mut next = v.clone();
                    next.is_following = !v.is_following;
                    next.user.followers_count += if next.is_following { 1 } else { -1 };
                    next
                },
                || async {
                    let result = follows.toggle_follow(viewer, &target_id).await?;
                    Ok::<_, ServiceError>(FollowView {
                        user: result.following,
                        is_following: result.action == FollowAction::Followed,
                    })
                },
            )
            .await?;

        if updated.is_following {
            self.notify(&updated.user.id, NotificationKind::Follow, None, FOLLOW_MESSAGE)
                .await;
        }
        Ok(updated)
    }

    /// Comment on `post`, bumping its counter speculatively
    pub async fn comment(
        &self,
        post: &mut Optimistic<Post>,
        req: NewComment,
    ) -> ServiceResult<Comment> {
        let post_id = post.confirmed().id.clone();
        let viewer = self.viewer.as_str();
        let content = &self.engine.content;
        let mut created = None;
        let slot = &mut created;

        let updated = post
            .mutate(
                |p| {
                    let mut next = p.clone();
                    next.comments_count += 1;
                    next
                },
                move || async move {
                    let result = content.create_comment(&post_id, viewer, req).await?;
                    *slot = Some(result.comment);
                    Ok::<_, ServiceError>(result.post)
                },
            )
            .await?;

        self.notify(
            &updated.author_id,
            NotificationKind::Comment,
            Some(updated.id.as_str()),
            COMMENT_MESSAGE,
        )
        .await;

        created.ok_or_else(|| ServiceError::Internal("comment missing after create".to_string()))
    }

    pub async fn notifications(&self) -> Vec<NotificationView> {
        let notifications = self.engine.notifications.notifications_for(&self.viewer).await;
        self.engine.notifications.describe(notifications).await
    }

    pub async fn unread_count(&self) -> usize {
        self.engine.notifications.unread_count(&self.viewer).await
    }

    /// Record a follow-up notification. Failures are logged only; the
    /// mutation that triggered it already succeeded.
    async fn notify(
        &self,
        recipient: &str,
        kind: NotificationKind,
        post_id: Option<&str>,
        message: &str,
    ) {
        if recipient == self.viewer {
            debug!(viewer = %self.viewer, kind = kind.as_str(), "Skipped self notification");
            return;
        }

        let req = NewNotification {
            user_id: recipient.to_string(),
            kind,
            post_id: post_id.map(str::to_string),
            actor_id: self.viewer.clone(),
            message: message.to_string(),
        };

        if let Err(e) = self.engine.notifications.create_notification(req).await {
            warn!(
                viewer = %self.viewer,
                recipient = %recipient,
                kind = kind.as_str(),
                error = %e,
                "Failed to record follow-up notification"
            );
        }
    }
}
