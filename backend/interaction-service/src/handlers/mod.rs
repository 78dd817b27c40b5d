/// HTTP handlers for interaction-service
pub mod conversations;
pub mod feed;
pub mod notifications;
pub mod posts;
pub mod users;

use actix_web::error::InternalError;
use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest, HttpResponse};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::state::AppState;

const USER_ID_HEADER: &str = "x-user-id";

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Acting user, taken from the `x-user-id` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer(pub String);

impl Viewer {
    pub fn id(&self) -> &str {
        &self.0
    }
}

fn unauthorized(message: &str) -> Error {
    InternalError::from_response(
        message.to_string(),
        HttpResponse::Unauthorized().json(ApiResponse::<()>::err(message.to_string())),
    )
    .into()
}

impl FromRequest for Viewer {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let viewer = match req.headers().get(USER_ID_HEADER) {
            None => Err(unauthorized("Missing x-user-id header")),
            Some(value) => match value.to_str() {
                Ok(id) if !id.trim().is_empty() => Ok(Viewer(id.trim().to_string())),
                _ => Err(unauthorized("Invalid x-user-id header")),
            },
        };
        ready(viewer)
    }
}

/// GET /health
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let stats = state.engine.store.stats().await;
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "env": state.config.app.env,
        "store": stats,
    }))
}

/// Register every route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
    users::register_routes(cfg);
    posts::register_routes(cfg);
    feed::register_routes(cfg);
    conversations::register_routes(cfg);
    notifications::register_routes(cfg);
}
