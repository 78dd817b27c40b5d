/// Direct message handlers
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::{ApiResponse, Viewer};
use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub receiver_id: String,
    pub content: String,
}

/// One summary per partner, most recent first
///
/// GET /api/v1/conversations
pub async fn list_conversations(
    state: web::Data<AppState>,
    viewer: Viewer,
) -> ServiceResult<HttpResponse> {
    let summaries = state.engine.conversations.conversations(viewer.id()).await;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(summaries)))
}

/// History with one partner, oldest first
///
/// GET /api/v1/conversations/{partner_id}
pub async fn get_conversation(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let history = state
        .engine
        .conversations
        .conversation_with(viewer.id(), &path)
        .await;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(history)))
}

/// Mark everything the viewer received from one partner as read
///
/// PUT /api/v1/conversations/{partner_id}/read
pub async fn mark_conversation_read(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let changed = state
        .engine
        .conversations
        .mark_conversation_read(viewer.id(), &path)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(changed)))
}

/// POST /api/v1/messages
pub async fn send_message(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: web::Json<SendMessagePayload>,
) -> ServiceResult<HttpResponse> {
    let payload = req.into_inner();
    let message = state
        .engine
        .conversations
        .send_message(viewer.id(), &payload.receiver_id, payload.content)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(message)))
}

/// GET /api/v1/messages/{id}
pub async fn get_message(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let message = state.engine.conversations.get_message(&path).await?;
    if !message.involves(viewer.id()) {
        return Err(ServiceError::invalid("message belongs to another conversation"));
    }
    Ok(HttpResponse::Ok().json(ApiResponse::ok(message)))
}

/// Only the receiver can mark a message read
///
/// PUT /api/v1/messages/{id}/read
pub async fn mark_message_read(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let message = state
        .engine
        .conversations
        .mark_message_read_for(&path, viewer.id())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(message)))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/conversations")
            .route("", web::get().to(list_conversations))
            .route("/{partner_id}", web::get().to(get_conversation))
            .route("/{partner_id}/read", web::put().to(mark_conversation_read)),
    )
    .service(
        web::scope("/api/v1/messages")
            .route("", web::post().to(send_message))
            .route("/{id}", web::get().to(get_message))
            .route("/{id}/read", web::put().to(mark_message_read)),
    );
}
