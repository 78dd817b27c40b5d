use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Limits;
use crate::domain::models::User;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{new_id, EntityStore};

const MIN_DISPLAY_NAME_LEN: usize = 2;

/// Request to register a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl NewUser {
    pub fn validate(&self, limits: &Limits) -> ServiceResult<()> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(ServiceError::invalid("username must not be empty"));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(ServiceError::invalid("username must not contain whitespace"));
        }
        validate_display_name(&self.display_name)?;
        if let Some(bio) = &self.bio {
            validate_bio(bio, limits)?;
        }
        Ok(())
    }
}

/// Partial profile update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self, limits: &Limits) -> ServiceResult<()> {
        if let Some(name) = &self.display_name {
            validate_display_name(name)?;
        }
        if let Some(bio) = &self.bio {
            validate_bio(bio, limits)?;
        }
        Ok(())
    }
}

fn validate_display_name(name: &str) -> ServiceResult<()> {
    if name.trim().chars().count() < MIN_DISPLAY_NAME_LEN {
        return Err(ServiceError::invalid(format!(
            "display name must be at least {} characters",
            MIN_DISPLAY_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_bio(bio: &str, limits: &Limits) -> ServiceResult<()> {
    if bio.chars().count() > limits.max_bio_length {
        return Err(ServiceError::invalid(format!(
            "bio must be {} characters or less",
            limits.max_bio_length
        )));
    }
    Ok(())
}

/// User directory: registration, lookup and profile edits.
///
/// Counters on [`User`] are never written here; they belong to the follow
/// and content services.
#[derive(Clone)]
pub struct UserService {
    store: Arc<EntityStore>,
    limits: Limits,
}

impl UserService {
    pub fn new(store: Arc<EntityStore>, limits: Limits) -> Self {
        Self { store, limits }
    }

    pub async fn create_user(&self, req: NewUser) -> ServiceResult<User> {
        req.validate(&self.limits)?;

        let user = User {
            id: new_id(),
            username: req.username.trim().to_string(),
            display_name: req.display_name.trim().to_string(),
            bio: req.bio.unwrap_or_default(),
            avatar: req.avatar,
            website: String::new(),
            location: String::new(),
            posts_count: 0,
            followers_count: 0,
            following_count: 0,
            created_at: Utc::now(),
        };

        let created = self
            .store
            .write(|t| {
                if t.users.iter().any(|u| u.username == user.username) {
                    return Err(ServiceError::Conflict(format!(
                        "username {} already taken",
                        user.username
                    )));
                }
                t.users.insert(user.clone())?;
                Ok(user)
            })
            .await?;

        info!(user_id = %created.id, username = %created.username, "Created user");
        Ok(created)
    }

    pub async fn get_user(&self, user_id: &str) -> ServiceResult<User> {
        self.store.read(|t| t.users.get(user_id).cloned()).await
    }

    pub async fn get_by_username(&self, username: &str) -> ServiceResult<User> {
        self.store
            .read(|t| {
                t.users
                    .iter()
                    .find(|u| u.username == username)
                    .cloned()
                    .ok_or_else(|| ServiceError::not_found("user", username))
            })
            .await
    }

    /// Case-insensitive match on username or display name
    pub async fn search_users(&self, query: &str) -> Vec<User> {
        let needle = query.trim().to_lowercase();
        let users = self
            .store
            .read(|t| {
                t.users.filter_cloned(|u| {
                    u.username.to_lowercase().contains(&needle)
                        || u.display_name.to_lowercase().contains(&needle)
                })
            })
            .await;
        debug!(query = %query, matches = users.len(), "Searched users");
        users
    }

    /// Most-followed users other than the viewer, ties kept in directory order
    pub async fn suggested_users(&self, viewer_id: &str, limit: usize) -> Vec<User> {
        let mut users = self
            .store
            .read(|t| t.users.filter_cloned(|u| u.id != viewer_id))
            .await;
        users.sort_by(|a, b| b.followers_count.cmp(&a.followers_count));
        users.truncate(limit);
        debug!(viewer_id = %viewer_id, count = users.len(), "Suggested users");
        users
    }

    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> ServiceResult<User> {
        update.validate(&self.limits)?;

        let user = self
            .store
            .write(|t| {
                t.users.update(user_id, |u| {
                    if let Some(name) = update.display_name {
                        u.display_name = name.trim().to_string();
                    }
                    if let Some(bio) = update.bio {
                        u.bio = bio;
                    }
                    if let Some(website) = update.website {
                        u.website = website;
                    }
                    if let Some(location) = update.location {
                        u.location = location;
                    }
                })
            })
            .await?;

        info!(user_id = %user_id, "Updated profile");
        Ok(user)
    }

    pub async fn update_avatar(&self, user_id: &str, avatar_url: String) -> ServiceResult<User> {
        if avatar_url.trim().is_empty() {
            return Err(ServiceError::invalid("avatar url must not be empty"));
        }

        let user = self
            .store
            .write(|t| t.users.update(user_id, |u| u.avatar = Some(avatar_url)))
            .await?;

        info!(user_id = %user_id, "Updated avatar");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> UserService {
        UserService::new(Arc::new(EntityStore::new()), Limits::default())
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            display_name: format!("{} display", username),
            bio: None,
            avatar: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let users = service();
        let created = users.create_user(new_user("ana")).await.unwrap();

        assert_eq!(created.posts_count, 0);
        assert_eq!(users.get_user(&created.id).await.unwrap(), created);
        assert_eq!(users.get_by_username("ana").await.unwrap().id, created.id);
        assert!(users.get_by_username("nobody").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let users = service();
        users.create_user(new_user("ana")).await.unwrap();

        let err = users.create_user(new_user("ana")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let users = service();
        users.create_user(new_user("Ana")).await.unwrap();
        users.create_user(new_user("bob")).await.unwrap();

        let found = users.search_users("aNA").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "Ana");
    }

    #[tokio::test]
    async fn test_bio_limit() {
        let users = service();
        let user = users.create_user(new_user("ana")).await.unwrap();

        let too_long = ProfileUpdate {
            bio: Some("x".repeat(161)),
            ..Default::default()
        };
        let err = users.update_profile(&user.id, too_long).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));

        let ok = ProfileUpdate {
            bio: Some("x".repeat(160)),
            location: Some("Lisbon".into()),
            ..Default::default()
        };
        let updated = users.update_profile(&user.id, ok).await.unwrap();
        assert_eq!(updated.bio.len(), 160);
        assert_eq!(updated.location, "Lisbon");
        assert_eq!(updated.display_name, "ana display");
    }

    #[tokio::test]
    async fn test_short_display_name_rejected() {
        let users = service();
        let mut req = new_user("ana");
        req.display_name = " a ".into();

        let err = users.create_user(req).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_suggested_users_rank_by_followers() {
        let mut seed = crate::store::SeedData::default();
        for (id, name) in [("1", "ana"), ("2", "bo"), ("3", "cy"), ("4", "di"), ("5", "ed")] {
            seed.users.push(User {
                id: id.into(),
                username: name.into(),
                display_name: name.to_uppercase(),
                bio: String::new(),
                avatar: None,
                website: String::new(),
                location: String::new(),
                posts_count: 0,
                followers_count: 0,
                following_count: 0,
                created_at: Utc::now(),
            });
        }
        // 4 <- 1,2,3 ; 2 <- 1 ; 5 <- 1 ; 3 <- 4,5
        for (from, to) in [("1", "4"), ("2", "4"), ("3", "4"), ("1", "2"), ("1", "5"), ("4", "3"), ("5", "3")] {
            seed.follows.push(crate::domain::models::FollowEdge::new(from, to));
        }
        let store = EntityStore::from_seed(seed).unwrap();
        let users = UserService::new(Arc::new(store), Limits::default());

        let ids = |list: Vec<User>| list.into_iter().map(|u| u.id).collect::<Vec<_>>();
        assert_eq!(ids(users.suggested_users("1", 3).await), vec!["4", "3", "2"]);
        assert_eq!(ids(users.suggested_users("4", 3).await), vec!["3", "2", "5"]);
        assert_eq!(users.suggested_users("1", 10).await.len(), 4);
    }

    #[tokio::test]
    async fn test_update_avatar() {
        let users = service();
        let user = users.create_user(new_user("ana")).await.unwrap();

        let updated = users
            .update_avatar(&user.id, "https://cdn/ana.png".into())
            .await
            .unwrap();
        assert_eq!(updated.avatar.as_deref(), Some("https://cdn/ana.png"));

        let err = users.update_avatar(&user.id, "  ".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_update_avatar_unknown_user() {
        let users = service();
        let err = users
            .update_avatar("ghost", "https://cdn/a.png".into())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
