//! Application route configuration.

use axum::{
    extract::State,
    http::{Method, StatusCode},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::filters::{filter_chain_middleware, FilterChain, TokenValidationFilter, ValidationFilter};
use super::handlers::auth_handler::{LoginRequest, RegisterRequest};
use super::handlers::product_handler::{CreateProductRequest, UpdateProductRequest};
use super::handlers::{auth_routes, product_routes, user_routes};
use super::middleware::{exception_boundary, request_context};
use super::AppState;
use crate::errors::AppError;

/// Token check first, then payload shape, so an unauthenticated malformed
/// request is rejected as unauthenticated.
pub fn filter_chain(state: &AppState) -> FilterChain {
    let tokens = TokenValidationFilter::new(state.tokens.clone())
        .allow_anonymous(Method::POST, "/api/auth/login")
        .allow_anonymous(Method::POST, "/api/auth/register");

    let payloads = ValidationFilter::new()
        .rule::<LoginRequest>(Method::POST, "/api/auth/login")
        .rule::<RegisterRequest>(Method::POST, "/api/auth/register")
        .rule::<CreateProductRequest>(Method::POST, "/api/products")
        .rule::<UpdateProductRequest>(Method::PUT, "/api/products/:id");

    let chain = FilterChain::new().with(tokens).with(payloads);
    tracing::debug!(filters = ?chain.names(), "filter chain assembled");
    chain
}

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/products", product_routes());

    Router::new()
        .nest("/api", api)
        .route_layer(middleware::from_fn_with_state(
            filter_chain(&state),
            filter_chain_middleware,
        ))
        .route("/health", get(health))
        .fallback(fallback)
        .layer(middleware::from_fn(request_context))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(exception_boundary))
        .with_state(state)
}

async fn fallback() -> AppError {
    AppError::NotFound
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}

/// Health check endpoint with database connectivity check
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.database.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "healthy",
            }),
        ),
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: "unhealthy",
                }),
            )
        }
    }
}
