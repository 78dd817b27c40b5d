/// Post, like and comment handlers
use actix_web::{web, HttpResponse};

use super::{ApiResponse, Viewer};
use crate::error::ServiceResult;
use crate::services::{NewComment, NewPost};
use crate::state::AppState;

/// Publish a post as the viewer
///
/// POST /api/v1/posts
pub async fn create_post(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: web::Json<NewPost>,
) -> ServiceResult<HttpResponse> {
    let post = state
        .engine
        .content
        .create_post(viewer.id(), req.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(post)))
}

/// GET /api/v1/posts/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let post = state.engine.content.get_post(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// Delete one of the viewer's posts
///
/// DELETE /api/v1/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let removed = state
        .engine
        .content
        .delete_post_as(&path, viewer.id())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(removed)))
}

/// POST /api/v1/posts/{id}/like
pub async fn toggle_like(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let post = state
        .engine
        .content
        .toggle_like(&path, viewer.id())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// GET /api/v1/posts/{id}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let comments = state.engine.content.comments_for_post(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(comments)))
}

/// POST /api/v1/posts/{id}/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
    req: web::Json<NewComment>,
) -> ServiceResult<HttpResponse> {
    let created = state
        .engine
        .content
        .create_comment(&path, viewer.id(), req.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(created)))
}

/// POST /api/v1/comments/{id}/like
pub async fn toggle_comment_like(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let comment = state
        .engine
        .content
        .toggle_comment_like(&path, viewer.id())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(comment)))
}

/// Delete a comment written by the viewer, or any comment on the
/// viewer's post
///
/// DELETE /api/v1/comments/{id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let post = state
        .engine
        .content
        .delete_comment_as(&path, viewer.id())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/posts")
            .route("", web::post().to(create_post))
            .route("/{id}", web::get().to(get_post))
            .route("/{id}", web::delete().to(delete_post))
            .route("/{id}/like", web::post().to(toggle_like))
            .route("/{id}/comments", web::get().to(list_comments))
            .route("/{id}/comments", web::post().to(create_comment)),
    )
    .service(
        web::scope("/api/v1/comments")
            .route("/{id}", web::delete().to(delete_comment))
            .route("/{id}/like", web::post().to(toggle_comment_like)),
    );
}
