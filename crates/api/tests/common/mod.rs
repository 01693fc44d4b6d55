#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use fundbridge_api::auth::jwt::{generate_access_token, JwtConfig};
use fundbridge_api::config::{JobIntervals, ServerConfig};
use fundbridge_api::router::build_app_router;
use fundbridge_api::state::AppState;
use fundbridge_core::types::DbId;
use fundbridge_engine::memory::MemoryStore;
use fundbridge_engine::FundingEngine;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const ADMIN: DbId = 1;
pub const SYSTEM: DbId = 2;
pub const CREATOR: DbId = 10;
pub const DONOR: DbId = 50;
pub const VOLUNTEER: DbId = 100;
pub const OTHER_VOLUNTEER: DbId = 101;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        store_timeout: std::time::Duration::from_secs(5),
        database_url: String::new(),
        db_max_connections: 1,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        },
        jobs: JobIntervals::default(),
    }
}

/// The full application router over `store`, with the production
/// middleware stack.
pub fn build_test_app(store: MemoryStore) -> Router {
    let config = test_config();
    let state = AppState {
        engine: FundingEngine::new(store),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// A bearer token as the identity provider would issue it.
pub fn token(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, 15, &test_config().jwt).unwrap()
}

pub fn admin() -> String {
    token(ADMIN, "admin")
}

pub fn system() -> String {
    token(SYSTEM, "system")
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header("authorization", format!("Bearer {bearer}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, bearer: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, bearer, None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    bearer: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(bearer), Some(body)).await
}

pub async fn post_empty(app: Router, uri: &str, bearer: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(bearer), None).await
}

pub async fn patch_json(
    app: Router,
    uri: &str,
    bearer: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(bearer), Some(body)).await
}

pub async fn delete(app: Router, uri: &str, bearer: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(bearer), None).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a campaign as [`CREATOR`] and moderate it to `live`. Returns its id.
pub async fn live_campaign(store: &MemoryStore, goal_amount: f64) -> i64 {
    let response = post_json(
        build_test_app(store.clone()),
        "/api/v1/campaigns",
        &token(CREATOR, "donee"),
        serde_json::json!({ "title": "Clean water", "goal_amount": goal_amount }),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    for status in ["pending", "approved", "live"] {
        let response = patch_json(
            build_test_app(store.clone()),
            &format!("/api/v1/campaigns/{id}"),
            &admin(),
            serde_json::json!({ "status": status }),
        )
        .await;
        assert_eq!(response.status(), 200);
    }
    id
}
