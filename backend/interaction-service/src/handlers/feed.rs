/// Feed handlers
use actix_web::{web, HttpResponse};

use super::{ApiResponse, Viewer};
use crate::error::ServiceResult;
use crate::state::AppState;

/// Posts by the viewer and everyone they follow
///
/// GET /api/v1/feed/home
pub async fn home_feed(state: web::Data<AppState>, viewer: Viewer) -> ServiceResult<HttpResponse> {
    let posts = state.engine.content.home_feed(viewer.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

/// GET /api/v1/feed/topic/{topic}
pub async fn topic_feed(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let posts = state.engine.content.topic_feed(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

/// GET /api/v1/feed/explore
pub async fn explore(state: web::Data<AppState>) -> ServiceResult<HttpResponse> {
    let posts = state.engine.content.explore().await;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/feed")
            .route("/home", web::get().to(home_feed))
            .route("/topic/{topic}", web::get().to(topic_feed))
            .route("/explore", web::get().to(explore)),
    );
}
