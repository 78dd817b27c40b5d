use actix_web::{http::StatusCode, test, web, App};
use interaction_service::config::{AppConfig, Config, Limits, LogFormat, LoggingConfig, SeedConfig};
use interaction_service::{handlers, AppState, EntityStore};
use serde_json::{json, Value};
use std::sync::Arc;

fn test_state() -> AppState {
    let config = Config {
        app: AppConfig {
            env: "test".to_string(),
            host: "127.0.0.1".to_string(),
            http_port: 0,
        },
        seed: SeedConfig { path: None },
        logging: LoggingConfig {
            format: LogFormat::Pretty,
        },
        limits: Limits::default(),
    };
    AppState::new(config, Arc::new(EntityStore::new()))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(handlers::configure),
        )
        .await
    };
}

macro_rules! create_user {
    ($app:expr, $username:expr) => {{
        let username: &str = $username;
        let req = test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(json!({ "username": username, "displayName": username.to_uppercase() }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        body["data"]["id"].as_str().unwrap().to_string()
    }};
}

#[actix_web::test]
async fn test_health() {
    let state = test_state();
    let app = app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"]["users"], 0);
}

#[actix_web::test]
async fn test_mutation_without_viewer_is_unauthorized() {
    let state = test_state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .set_json(json!({ "content": "hello" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_follow_post_like_flow() {
    let state = test_state();
    let app = app!(state);
    let ana = create_user!(app, "ana");
    let bo = create_user!(app, "bo");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/users/{}/follow", bo))
        .insert_header(("x-user-id", ana.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["action"], "followed");
    assert_eq!(body["data"]["following"]["followersCount"], 1);

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(("x-user-id", bo.as_str()))
        .set_json(json!({ "content": "hello" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/v1/feed/home")
        .insert_header(("x-user-id", ana.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["id"], post_id.as_str());

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{}/like", post_id))
        .insert_header(("x-user-id", ana.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["likerIds"], json!([ana]));
}

#[actix_web::test]
async fn test_errors_use_api_response_envelope() {
    let state = test_state();
    let app = app!(state);
    let ana = create_user!(app, "ana");

    let req = test::TestRequest::get().uri("/api/v1/posts/missing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Not found: post missing");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/users/{}/follow", ana))
        .insert_header(("x-user-id", ana.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(json!({ "username": "ana", "displayName": "Ana again" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_notifications_group_and_read_all() {
    let state = test_state();
    let app = app!(state);
    let owner = create_user!(app, "owner");
    let x = create_user!(app, "xena");
    let y = create_user!(app, "yuri");

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(("x-user-id", owner.as_str()))
        .set_json(json!({ "content": "look" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let mut statuses = Vec::new();
    for actor in [&x, &y] {
        let req = test::TestRequest::post()
            .uri("/api/v1/notifications")
            .insert_header(("x-user-id", actor.as_str()))
            .set_json(json!({
                "userId": owner,
                "type": "like",
                "postId": post_id,
                "message": "liked your post"
            }))
            .to_request();
        statuses.push(test::call_service(&app, req).await.status());
    }
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::OK]);

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications")
        .insert_header(("x-user-id", owner.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["groupCount"], 2);
    assert_eq!(body["data"][0]["displayText"], "YURI and XENA liked your post");

    let req = test::TestRequest::put()
        .uri("/api/v1/notifications/read-all")
        .insert_header(("x-user-id", owner.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications/unread-count")
        .insert_header(("x-user-id", owner.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["count"], 0);
}

#[actix_web::test]
async fn test_messages_and_conversations() {
    let state = test_state();
    let app = app!(state);
    let ana = create_user!(app, "ana");
    let bo = create_user!(app, "bo");

    for content in ["hi", "are you there?"] {
        let req = test::TestRequest::post()
            .uri("/api/v1/messages")
            .insert_header(("x-user-id", ana.as_str()))
            .set_json(json!({ "receiverId": bo, "content": content }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/conversations")
        .insert_header(("x-user-id", bo.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["partnerId"], ana.as_str());
    assert_eq!(body["data"][0]["unreadCount"], 2);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/conversations/{}/read", ana))
        .insert_header(("x-user-id", bo.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/conversations/{}", bo))
        .insert_header(("x-user-id", ana.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["content"], "hi");
    assert_eq!(body["data"][1]["read"], true);
}

#[actix_web::test]
async fn test_suggested_users_and_avatar() {
    let state = test_state();
    let app = app!(state);
    let ana = create_user!(app, "ana");
    let bo = create_user!(app, "bo");
    let cy = create_user!(app, "cy");

    for follower in [&ana, &bo] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/users/{}/follow", cy))
            .insert_header(("x-user-id", follower.as_str()))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/users/suggested?limit=2")
        .insert_header(("x-user-id", ana.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![cy.as_str(), bo.as_str()]);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/users/{}/avatar", bo))
        .insert_header(("x-user-id", ana.as_str()))
        .set_json(json!({ "avatarUrl": "https://cdn/x.png" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/users/{}/avatar", ana))
        .insert_header(("x-user-id", ana.as_str()))
        .set_json(json!({ "avatarUrl": "https://cdn/ana.png" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["avatar"], "https://cdn/ana.png");
}

#[actix_web::test]
async fn test_only_owners_delete_or_mark_read() {
    let state = test_state();
    let app = app!(state);
    let ana = create_user!(app, "ana");
    let bo = create_user!(app, "bo");

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(("x-user-id", ana.as_str()))
        .set_json(json!({ "content": "keep me" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/posts/{}", post_id))
        .insert_header(("x-user-id", bo.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/v1/notifications")
        .insert_header(("x-user-id", bo.as_str()))
        .set_json(json!({
            "userId": ana,
            "type": "like",
            "postId": post_id,
            "message": "liked your post"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let notification_id = body["data"]["notification"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/notifications/{}/read", notification_id))
        .insert_header(("x-user-id", bo.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/notifications/{}", notification_id))
        .insert_header(("x-user-id", ana.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["isRead"], false);
    assert_eq!(body["data"]["displayText"], "BO liked your post");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/posts/{}", post_id))
        .insert_header(("x-user-id", ana.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
