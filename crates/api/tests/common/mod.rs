#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use crewhub_api::auth::jwt::{generate_access_token, JwtConfig};
use crewhub_api::config::ServerConfig;
use crewhub_api::router::build_app_router;
use crewhub_api::state::AppState;
use crewhub_cache::MemoryCache;
use crewhub_events::EventBus;
use crewhub_likes::{LikeStrategy, LikesConfig};
use crewhub_points::DecayConfig;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        trust_forwarded_for: true,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, LikeStrategy::Direct)
}

/// Same middleware stack as the binary, over an in-process cache.
pub fn build_test_app_with(pool: PgPool, strategy: LikeStrategy) -> Router {
    let likes_config = LikesConfig {
        strategy,
        ..LikesConfig::default()
    };
    let state = AppState::new(
        pool,
        test_config(),
        Arc::new(MemoryCache::new()),
        Arc::new(EventBus::default()),
        &likes_config,
        DecayConfig::default(),
    );
    build_app_router(state)
}

pub fn token(user_id: i64, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    forwarded_for: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    if let Some(ip) = forwarded_for {
        builder = builder.header("x-forwarded-for", ip);
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

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None, None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    bearer: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, bearer, None, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn create_post(pool: &PgPool) -> i64 {
    sqlx::query_scalar("INSERT INTO posts (author_id) VALUES (1) RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap()
}
