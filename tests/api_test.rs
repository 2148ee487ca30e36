//! Integration tests for API endpoints.
//!
//! Requests go through the full router (exception boundary, request
//! context, filter chain) against an in-memory SQLite database.

mod common;

use async_trait::async_trait;
use axum::http::{header, Method, StatusCode};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use common::{login_as, register, send, send_raw, test_app, test_config, test_database};
use factory_api::api::{create_router, AppState};
use factory_api::domain::{NewProduct, Product, ProductChanges};
use factory_api::errors::{AppError, AppResult};
use factory_api::infra::{JwtCodec, TokenRegistry};
use factory_api::services::{ProductService, ServiceContainer, Services};

// =============================================================================
// Counting product service, used to prove the handler never ran
// =============================================================================

#[derive(Default)]
struct CountingProducts {
    calls: AtomicUsize,
}

impl CountingProducts {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProductService for CountingProducts {
    async fn list_products(&self) -> AppResult<Vec<Product>> {
        self.hit();
        Ok(Vec::new())
    }

    async fn get_product(&self, _id: Uuid) -> AppResult<Product> {
        self.hit();
        Err(AppError::NotFound)
    }

    async fn create_product(&self, owner: Uuid, input: NewProduct) -> AppResult<Product> {
        self.hit();
        Ok(Product::new(input, owner))
    }

    async fn update_product(&self, _id: Uuid, _changes: ProductChanges) -> AppResult<Product> {
        self.hit();
        Err(AppError::NotFound)
    }

    async fn delete_product(&self, _id: Uuid) -> AppResult<()> {
        self.hit();
        Ok(())
    }
}

/// Real token and user services, counting product service.
async fn counting_app() -> (axum::Router, Arc<CountingProducts>) {
    let config = test_config();
    let database = test_database().await;
    let codec = Arc::new(JwtCodec::from_config(&config));
    let tokens = Arc::new(TokenRegistry::new(codec.clone()));
    let real = Services::from_connection(database.get_connection(), codec, tokens.clone());

    let products = Arc::new(CountingProducts::default());
    let services = Services::new(real.tokens(), real.users(), products.clone());
    let state = AppState::new(&services, tokens, database);

    (create_router(state), products)
}

fn widget(quantity: i64) -> serde_json::Value {
    json!({
        "name": "Widget",
        "description": "Steel widget",
        "quantity": quantity,
        "unit_price": 2.5
    })
}

// =============================================================================
// Token lifecycle
// =============================================================================

#[tokio::test]
async fn test_login_create_logout_then_token_is_dead() {
    let (app, state) = test_app().await;
    let token = login_as(&app, "alice").await;
    assert_eq!(state.tokens.len(), 1);

    let created = send(&app, Method::POST, "/api/products", Some(&token), Some(widget(5))).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["name"], "Widget");
    assert_eq!(created.body["quantity"], 5);

    let listed = send(&app, Method::GET, "/api/products", Some(&token), None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body.as_array().unwrap().len(), 1);

    let logout = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(logout.status, StatusCode::NO_CONTENT);
    assert!(state.tokens.is_empty());

    let rejected = send(&app, Method::POST, "/api/products", Some(&token), Some(widget(7))).await;
    assert_eq!(rejected.status, StatusCode::UNAUTHORIZED);
    assert_eq!(rejected.kind(), "UNAUTHORIZED");
    assert_eq!(rejected.headers[header::WWW_AUTHENTICATE], "Bearer");

    let fresh = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "user_name": "alice", "password": "secret" })),
    )
    .await;
    let fresh = fresh.body["access_token"].as_str().unwrap().to_string();
    assert_ne!(fresh, token);

    let listed = send(&app, Method::GET, "/api/products", Some(&fresh), None).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_or_invalid_token_never_reaches_handler() {
    let (app, products) = counting_app().await;

    let missing = send(&app, Method::GET, "/api/products", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let invalid = send(&app, Method::GET, "/api/products", Some("not-a-token"), None).await;
    assert_eq!(invalid.status, StatusCode::UNAUTHORIZED);

    assert_eq!(products.calls(), 0);

    let token = login_as(&app, "bea").await;
    let ok = send(&app, Method::GET, "/api/products", Some(&token), None).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(products.calls(), 1);
}

#[tokio::test]
async fn test_token_is_checked_before_payload() {
    let (app, products) = counting_app().await;

    let response = send_raw(
        &app,
        Method::POST,
        "/api/products",
        None,
        Some("{ not json".to_string()),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.kind(), "UNAUTHORIZED");
    assert_eq!(products.calls(), 0);
}

// =============================================================================
// Payload validation
// =============================================================================

#[tokio::test]
async fn test_negative_quantity_rejected_and_nothing_persisted() {
    let (app, state) = test_app().await;
    let token = login_as(&app, "carl").await;

    let response = send(&app, Method::POST, "/api/products", Some(&token), Some(widget(-1))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.kind(), "VALIDATION_FAILED");
    assert_eq!(response.violation_fields(), vec!["quantity"]);

    assert!(state.product_service.list_products().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_every_violation_is_reported_the_same_way_twice() {
    let (app, products) = counting_app().await;
    let token = login_as(&app, "dina").await;
    let body = json!({ "name": "", "quantity": -4, "unit_price": -1.0 });

    let first = send(&app, Method::POST, "/api/products", Some(&token), Some(body.clone())).await;
    let second = send(&app, Method::POST, "/api/products", Some(&token), Some(body)).await;

    assert_eq!(first.status, StatusCode::BAD_REQUEST);
    assert_eq!(first.violation_fields(), vec!["name", "quantity", "unit_price"]);
    assert_eq!(first.body, second.body);
    assert_eq!(products.calls(), 0);
}

#[tokio::test]
async fn test_wrong_type_is_reported_with_the_other_violations() {
    let (app, products) = counting_app().await;
    let token = login_as(&app, "dora").await;
    let body = json!({ "name": 5, "quantity": -1, "unit_price": 1.0 });

    let response = send(&app, Method::POST, "/api/products", Some(&token), Some(body)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.violation_fields(), vec!["name", "quantity"]);
    assert_eq!(products.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_with_valid_token_is_bad_request() {
    let (app, products) = counting_app().await;
    let token = login_as(&app, "eve").await;

    let response = send_raw(
        &app,
        Method::POST,
        "/api/products",
        Some(&token),
        Some("{ not json".to_string()),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.violation_fields(), vec!["body"]);
    assert_eq!(products.calls(), 0);
}

#[tokio::test]
async fn test_partial_update_validates_present_fields_only() {
    let (app, _) = test_app().await;
    let token = login_as(&app, "finn").await;

    let created = send(&app, Method::POST, "/api/products", Some(&token), Some(widget(3))).await;
    let uri = format!("/api/products/{}", created.body["id"].as_str().unwrap());

    let updated = send(&app, Method::PUT, &uri, Some(&token), Some(json!({ "quantity": 9 }))).await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["quantity"], 9);
    assert_eq!(updated.body["name"], "Widget");

    let rejected = send(&app, Method::PUT, &uri, Some(&token), Some(json!({ "quantity": -9 }))).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);

    let fetched = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(fetched.body["quantity"], 9);

    let deleted = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.kind(), "NOT_FOUND");
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn test_login_with_bad_credentials() {
    let (app, state) = test_app().await;
    register(&app, "gina", "secret").await;

    for (user_name, password) in [("gina", "wrong"), ("nobody", "secret")] {
        let response = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "user_name": user_name, "password": password })),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.kind(), "INVALID_CREDENTIALS");
    }
    assert!(state.tokens.is_empty());
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let (app, _) = test_app().await;

    let response = send(&app, Method::POST, "/api/auth/login", None, Some(json!({}))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.violation_fields(), vec!["password", "user_name"]);
}

#[tokio::test]
async fn test_register_rules_and_duplicates() {
    let (app, _) = test_app().await;

    let created = register(&app, "hank", "secret").await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["user_name"], "hank");
    assert!(created.body.get("password_hash").is_none());

    let duplicate = register(&app, "hank", "other").await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.kind(), "CONFLICT");

    let short = register(&app, "ivy", "pw").await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.violation_fields(), vec!["password"]);
}

#[tokio::test]
async fn test_current_user_and_listing() {
    let (app, _) = test_app().await;
    let token = login_as(&app, "jade").await;
    register(&app, "kurt", "secret").await;

    let me = send(&app, Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user_name"], "jade");

    let all = send(&app, Method::GET, "/api/users", Some(&token), None).await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);
}

// =============================================================================
// Uniform surface
// =============================================================================

#[tokio::test]
async fn test_unknown_route_is_uniform_not_found() {
    let (app, _) = test_app().await;

    let response = send(&app, Method::GET, "/nope", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.kind(), "NOT_FOUND");
    assert_eq!(response.body["error"]["status"], 404);
}

#[tokio::test]
async fn test_wrong_method_is_uniform() {
    let (app, _) = test_app().await;

    let response = send(&app, Method::DELETE, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.kind(), "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = test_app().await;

    let response = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _) = test_app().await;

    let request = axum::http::Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-me-42");
}
