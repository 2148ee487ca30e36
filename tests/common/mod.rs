//! Shared helpers for integration tests.
//!
//! Every test gets its own migrated in-memory database and a router wired
//! exactly like the server's.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use factory_api::api::{create_router, AppState};
use factory_api::config::Config;
use factory_api::infra::Database;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

pub fn test_config() -> Config {
    Config::builder(TEST_SECRET)
        .issuer("factory-api-tests")
        .audience("factory-api-clients")
        .expiration_minutes(5)
        .build()
        .unwrap()
}

pub async fn test_database() -> Arc<Database> {
    Arc::new(Database::in_memory().await.unwrap())
}

/// Router plus the state behind it, over a fresh database.
pub async fn test_app() -> (Router, AppState) {
    let state = AppState::from_config(test_database().await, &test_config());
    (create_router(state.clone()), state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn kind(&self) -> &str {
        self.body["error"]["kind"].as_str().unwrap_or_default()
    }

    pub fn violation_fields(&self) -> Vec<String> {
        self.body["error"]["violations"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|v| v["field"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    send_raw(app, method, uri, token, body.map(|b| b.to_string())).await
}

pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<String>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn register(app: &Router, user_name: &str, password: &str) -> TestResponse {
    send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "user_name": user_name, "password": password })),
    )
    .await
}

/// Register `user_name` and log in, returning the bearer token.
pub async fn login_as(app: &Router, user_name: &str) -> String {
    let registered = register(app, user_name, "secret").await;
    assert_eq!(registered.status, StatusCode::CREATED);

    let login = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "user_name": user_name, "password": "secret" })),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    login.body["access_token"].as_str().unwrap().to_string()
}
