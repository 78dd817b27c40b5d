use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Limits;
use crate::domain::models::{Comment, Post};
use crate::error::{ServiceError, ServiceResult};
use crate::services::follow::FollowService;
use crate::store::{new_id, EntityStore};

/// Request to publish a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub content: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

impl NewPost {
    pub fn validate(&self, limits: &Limits) -> ServiceResult<()> {
        validate_body("post content", &self.content, limits)?;
        if self.media_urls.len() > limits.max_media_per_post {
            return Err(ServiceError::invalid(format!(
                "a post can carry at most {} media attachments",
                limits.max_media_per_post
            )));
        }
        if self.media_urls.iter().any(|url| url.trim().is_empty()) {
            return Err(ServiceError::invalid("media urls must not be empty"));
        }
        Ok(())
    }
}

/// Request to comment on a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// The new comment together with its post's updated counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreated {
    pub comment: Comment,
    pub post: Post,
}

/// Non-blank and within the configured length
pub(crate) fn validate_body(what: &str, body: &str, limits: &Limits) -> ServiceResult<()> {
    if body.trim().is_empty() {
        return Err(ServiceError::invalid(format!("{} must not be empty", what)));
    }
    if body.chars().count() > limits.max_post_length {
        return Err(ServiceError::invalid(format!(
            "{} must be {} characters or less",
            what, limits.max_post_length
        )));
    }
    Ok(())
}

/// Symmetric-difference update of a like set; returns true when `user_id`
/// is a member afterwards.
fn toggle_member(ids: &mut Vec<String>, user_id: &str) -> bool {
    match ids.iter().position(|id| id == user_id) {
        Some(pos) => {
            ids.remove(pos);
            false
        }
        None => {
            ids.push(user_id.to_string());
            true
        }
    }
}

/// Newest first; stable, so equal timestamps keep insertion order
fn newest_first(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts
}

/// Posts, comments, likes and feed assembly
#[derive(Clone)]
pub struct ContentService {
    store: Arc<EntityStore>,
    limits: Limits,
}

impl ContentService {
    pub fn new(store: Arc<EntityStore>, limits: Limits) -> Self {
        Self { store, limits }
    }

    // ========== Posts ==========

    pub async fn create_post(&self, author_id: &str, req: NewPost) -> ServiceResult<Post> {
        req.validate(&self.limits)?;

        let post = Post {
            id: new_id(),
            author_id: author_id.to_string(),
            content: req.content,
            media_urls: req.media_urls,
            liker_ids: Vec::new(),
            comments_count: 0,
            created_at: Utc::now(),
        };

        let created = self
            .store
            .write(|t| {
                t.users.get(author_id)?;
                t.posts.insert(post.clone())?;
                t.users.update(author_id, |u| u.posts_count += 1)?;
                Ok(post)
            })
            .await?;

        info!(post_id = %created.id, author_id = %author_id, "Created post");
        Ok(created)
    }

    pub async fn get_post(&self, post_id: &str) -> ServiceResult<Post> {
        self.store.read(|t| t.posts.get(post_id).cloned()).await
    }

    /// Remove a post with its comments and every notification about it
    pub async fn delete_post(&self, post_id: &str) -> ServiceResult<Post> {
        self.remove_post(post_id, None).await
    }

    /// [`delete_post`](Self::delete_post) on behalf of `user_id`, who must
    /// be the author
    pub async fn delete_post_as(&self, post_id: &str, user_id: &str) -> ServiceResult<Post> {
        self.remove_post(post_id, Some(user_id)).await
    }

    async fn remove_post(&self, post_id: &str, acting_user: Option<&str>) -> ServiceResult<Post> {
        let (post, comments, notifications) = self
            .store
            .write(|t| {
                let author_id = t.posts.get(post_id)?.author_id.clone();
                if acting_user.is_some_and(|user_id| user_id != author_id) {
                    return Err(ServiceError::invalid("only the author can delete a post"));
                }
                let post = t.posts.remove(post_id)?;
                let comments = t.comments.remove_where(|c| c.post_id == post_id);
                let notifications = t
                    .notifications
                    .remove_where(|n| n.post_id.as_deref() == Some(post_id));
                if t.users.contains(&author_id) {
                    t.users
                        .update(&author_id, |u| u.posts_count = (u.posts_count - 1).max(0))?;
                }
                Ok((post, comments.len(), notifications.len()))
            })
            .await?;

        info!(
            post_id = %post_id,
            comments_removed = comments,
            notifications_removed = notifications,
            "Deleted post"
        );
        Ok(post)
    }

    pub async fn posts_by_user(&self, user_id: &str) -> ServiceResult<Vec<Post>> {
        let posts = self
            .store
            .read(|t| {
                t.users.get(user_id)?;
                Ok(t.posts.filter_cloned(|p| p.author_id == user_id))
            })
            .await?;
        Ok(newest_first(posts))
    }

    /// Add or remove `user_id` from the post's like set and return the
    /// full post
    pub async fn toggle_like(&self, post_id: &str, user_id: &str) -> ServiceResult<Post> {
        let (post, liked) = self
            .store
            .write(|t| {
                t.posts.get(post_id)?;
                t.users.get(user_id)?;
                let mut liked = false;
                let post = t
                    .posts
                    .update(post_id, |p| liked = toggle_member(&mut p.liker_ids, user_id))?;
                Ok((post, liked))
            })
            .await?;

        info!(
            post_id = %post_id,
            user_id = %user_id,
            liked,
            like_count = post.like_count(),
            "Toggled post like"
        );
        Ok(post)
    }

    // ========== Comments ==========

    /// Create a comment and bump the post's counter by exactly one
    pub async fn create_comment(
        &self,
        post_id: &str,
        author_id: &str,
        req: NewComment,
    ) -> ServiceResult<CommentCreated> {
        validate_body("comment", &req.content, &self.limits)?;

        let comment = Comment {
            id: new_id(),
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            content: req.content,
            parent_id: req.parent_id,
            liker_ids: Vec::new(),
            created_at: Utc::now(),
        };

        let created = self
            .store
            .write(|t| {
                t.posts.get(post_id)?;
                t.users.get(author_id)?;
                if let Some(parent_id) = &comment.parent_id {
                    let parent = t.comments.get(parent_id)?;
                    if parent.post_id != post_id {
                        return Err(ServiceError::invalid(
                            "parent comment belongs to another post",
                        ));
                    }
                    if parent.is_reply() {
                        return Err(ServiceError::invalid("replies can only be one level deep"));
                    }
                }

                t.comments.insert(comment.clone())?;
                let post = t.posts.update(post_id, |p| p.comments_count += 1)?;
                Ok(CommentCreated { comment, post })
            })
            .await?;

        info!(
            comment_id = %created.comment.id,
            post_id = %post_id,
            author_id = %author_id,
            comments_count = created.post.comments_count,
            "Created comment"
        );
        Ok(created)
    }

    pub async fn get_comment(&self, comment_id: &str) -> ServiceResult<Comment> {
        self.store.read(|t| t.comments.get(comment_id).cloned()).await
    }

    /// Comments on a post, oldest first
    pub async fn comments_for_post(&self, post_id: &str) -> ServiceResult<Vec<Comment>> {
        let mut comments = self
            .store
            .read(|t| {
                t.posts.get(post_id)?;
                Ok(t.comments.filter_cloned(|c| c.post_id == post_id))
            })
            .await?;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    /// Remove a comment and its replies; the post counter drops by the
    /// number of comments removed.
    pub async fn delete_comment(&self, comment_id: &str) -> ServiceResult<Post> {
        self.remove_comment(comment_id, None).await
    }

    /// [`delete_comment`](Self::delete_comment) on behalf of `user_id`, who
    /// must have written the comment or the post it belongs to
    pub async fn delete_comment_as(&self, comment_id: &str, user_id: &str) -> ServiceResult<Post> {
        self.remove_comment(comment_id, Some(user_id)).await
    }

    async fn remove_comment(
        &self,
        comment_id: &str,
        acting_user: Option<&str>,
    ) -> ServiceResult<Post> {
        let (post, removed) = self
            .store
            .write(|t| {
                let comment = t.comments.get(comment_id)?;
                let post_id = comment.post_id.clone();
                let post_author = &t.posts.get(&post_id)?.author_id;
                if let Some(user_id) = acting_user {
                    if comment.author_id != user_id && *post_author != user_id {
                        return Err(ServiceError::invalid(
                            "only the comment or post author can delete a comment",
                        ));
                    }
                }

                let removed = t.comments.remove_where(|c| {
                    c.id == comment_id || c.parent_id.as_deref() == Some(comment_id)
                });
                let delta = removed.len() as i64;
                let post = t.posts.update(&post_id, |p| {
                    p.comments_count = (p.comments_count - delta).max(0)
                })?;
                Ok((post, removed.len()))
            })
            .await?;

        info!(
            comment_id = %comment_id,
            post_id = %post.id,
            removed,
            comments_count = post.comments_count,
            "Deleted comment"
        );
        Ok(post)
    }

    pub async fn toggle_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> ServiceResult<Comment> {
        let comment = self
            .store
            .write(|t| {
                t.comments.get(comment_id)?;
                t.users.get(user_id)?;
                t.comments
                    .update(comment_id, |c| {
                        toggle_member(&mut c.liker_ids, user_id);
                    })
            })
            .await?;

        info!(
            comment_id = %comment_id,
            user_id = %user_id,
            liked = comment.is_liked_by(user_id),
            "Toggled comment like"
        );
        Ok(comment)
    }

    // ========== Feeds ==========

    /// Posts by `user_id` and everyone they follow, newest first
    pub async fn home_feed(&self, user_id: &str) -> ServiceResult<Vec<Post>> {
        let posts = self
            .store
            .read(|t| {
                t.users.get(user_id)?;
                let mut members = FollowService::following_ids_in(t, user_id);
                members.insert(user_id.to_string());
                Ok(t.posts.filter_cloned(|p| members.contains(&p.author_id)))
            })
            .await?;

        debug!(user_id = %user_id, count = posts.len(), "Assembled home feed");
        Ok(newest_first(posts))
    }

    /// Posts mentioning `topic` (leading `#` ignored, case-insensitive)
    pub async fn topic_feed(&self, topic: &str) -> ServiceResult<Vec<Post>> {
        let trimmed = topic.trim();
        let needle = trimmed.strip_prefix('#').unwrap_or(trimmed).trim().to_lowercase();
        if needle.is_empty() {
            return Err(ServiceError::invalid("topic must not be empty"));
        }

        let posts = self
            .store
            .read(|t| t.posts.filter_cloned(|p| p.content.to_lowercase().contains(&needle)))
            .await;

        debug!(topic = %needle, count = posts.len(), "Assembled topic feed");
        Ok(newest_first(posts))
    }

    /// Every post, newest first
    pub async fn explore(&self) -> Vec<Post> {
        let posts = self.store.read(|t| t.posts.iter().cloned().collect()).await;
        newest_first(posts)
    }
}
