/// Notification handlers
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::{ApiResponse, Viewer};
use crate::domain::models::NotificationKind;
use crate::error::{ServiceError, ServiceResult};
use crate::services::NewNotification;
use crate::state::AppState;

/// Request to notify a user about something the viewer did
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationPayload {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub post_id: Option<String>,
    pub message: String,
}

/// Viewer's notifications with rendered text, newest first
///
/// GET /api/v1/notifications
pub async fn list_notifications(
    state: web::Data<AppState>,
    viewer: Viewer,
) -> ServiceResult<HttpResponse> {
    let service = &state.engine.notifications;
    let views = service
        .describe(service.notifications_for(viewer.id()).await)
        .await;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(views)))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    state: web::Data<AppState>,
    viewer: Viewer,
) -> ServiceResult<HttpResponse> {
    let count = state.engine.notifications.unread_count(viewer.id()).await;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({ "count": count }))))
}

/// Record a notification with the viewer as actor. Responds 201 when a new
/// record was created and 200 when an existing group absorbed it.
///
/// POST /api/v1/notifications
pub async fn create_notification(
    state: web::Data<AppState>,
    viewer: Viewer,
    req: web::Json<CreateNotificationPayload>,
) -> ServiceResult<HttpResponse> {
    let payload = req.into_inner();
    let outcome = state
        .engine
        .notifications
        .create_notification(NewNotification {
            user_id: payload.user_id,
            kind: payload.kind,
            post_id: payload.post_id,
            actor_id: viewer.0,
            message: payload.message,
        })
        .await?;

    let response = if outcome.created() {
        HttpResponse::Created().json(ApiResponse::ok(outcome))
    } else {
        HttpResponse::Ok().json(ApiResponse::ok(outcome))
    };
    Ok(response)
}

/// GET /api/v1/notifications/{id}
pub async fn get_notification(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let service = &state.engine.notifications;
    let notification = service.get_notification(&path).await?;
    if notification.user_id != viewer.id() {
        return Err(ServiceError::invalid("notification belongs to another user"));
    }

    let mut views = service.describe(vec![notification]).await;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(views.pop())))
}

/// PUT /api/v1/notifications/{id}/read
pub async fn mark_as_read(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    let notification = state
        .engine
        .notifications
        .mark_as_read_for(&path, viewer.id())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(notification)))
}

/// PUT /api/v1/notifications/read-all
pub async fn mark_all_as_read(
    state: web::Data<AppState>,
    viewer: Viewer,
) -> ServiceResult<HttpResponse> {
    let changed = state
        .engine
        .notifications
        .mark_all_as_read(viewer.id())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(changed)))
}

/// DELETE /api/v1/notifications/{id}
pub async fn delete_notification(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<String>,
) -> ServiceResult<HttpResponse> {
    state
        .engine
        .notifications
        .delete_notification_for(&path, viewer.id())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .route("", web::get().to(list_notifications))
            .route("", web::post().to(create_notification))
            .route("/unread-count", web::get().to(unread_count))
            .route("/read-all", web::put().to(mark_all_as_read))
            .route("/{id}/read", web::put().to(mark_as_read))
            .route("/{id}", web::get().to(get_notification))
            .route("/{id}", web::delete().to(delete_notification)),
    );
}
