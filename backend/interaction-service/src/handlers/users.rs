/// User directory and follow graph handlers
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::debug;

use super::{ApiResponse, Viewer};
use crate::error::{ServiceError, ServiceResult};
use crate::services::{NewUser, ProfileUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Register a user
///
/// POST /api/v1/users
pub async fn create_user(
    state: web::Data<AppState>,
    req: web::Json<NewUser>,
) -> ServiceResult<HttpResponse> {
    let user = state.engine.users.create_user(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(user)))
}

/// Search users by username or display name
///
/// GET /api/v1/users?q=
pub async fn search_users(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> ServiceResult<HttpResponse> {
    let users = state.engine.users.search_users(&query.q).await;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(users)))
}

#[derive(Debug, Deserialize)]
pub struct SuggestedQuery {
    #[serde(default = "default_suggested_limit")]
    pub limit: usize,
}

fn default_suggested_limit() -> usize {
    3
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarPayload {
    pub avatar_url: String,
}

/// Most-followed users the viewer might follow
///
/// GET /api/v1/users/suggested?limit=
pub async fn suggested_users(
    state: web::Data<AppState>,
    viewer: Viewer,
    query: web::Query<SuggestedQuery>,
) -> ServiceResult<HttpResponse> {
    let users = state
        .engine
        .users
        .suggested_users(viewer.id(), query.limit)
        .await;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(users)))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let user = state.engine.users.get_user(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

/// Edit the viewer's own profile
///
/// PUT /api/v1/users/{id}/profile
pub async fn update_profile(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
    req: web::Json<ProfileUpdate>,
) -> ServiceResult<HttpResponse> {
    let user_id = path.into_inner();
    if viewer.id() != user_id {
        return Err(ServiceError::invalid("cannot edit another user's profile"));
    }

    let user = state
        .engine
        .users
        .update_profile(&user_id, req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

/// PUT /api/v1/users/{id}/avatar
pub async fn update_avatar(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
    req: web::Json<AvatarPayload>,
) -> ServiceResult<HttpResponse> {
    let user_id = path.into_inner();
    if viewer.id() != user_id {
        return Err(ServiceError::invalid("cannot change another user's avatar"));
    }

    let user = state
        .engine
        .users
        .update_avatar(&user_id, req.into_inner().avatar_url)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

/// Viewer follows or unfollows `id`
///
/// POST /api/v1/users/{id}/follow
pub async fn toggle_follow(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let result = state
        .engine
        .follows
        .toggle_follow(viewer.id(), &path)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(result)))
}

/// GET /api/v1/users/{id}/followers
pub async fn followers(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let edges = state.engine.follows.followers_of(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(edges)))
}

/// GET /api/v1/users/{id}/following
pub async fn following(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let edges = state.engine.follows.following_of(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(edges)))
}

/// GET /api/v1/users/{id}/posts
pub async fn user_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let posts = state.engine.content.posts_by_user(&path).await?;
    debug!(user_id = %path, count = posts.len(), "Listed user posts");
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/users")
            .route("", web::post().to(create_user))
            .route("", web::get().to(search_users))
            .route("/suggested", web::get().to(suggested_users))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}/profile", web::put().to(update_profile))
            .route("/{id}/avatar", web::put().to(update_avatar))
            .route("/{id}/follow", web::post().to(toggle_follow))
            .route("/{id}/followers", web::get().to(followers))
            .route("/{id}/following", web::get().to(following))
            .route("/{id}/posts", web::get().to(user_posts)),
    );
}
