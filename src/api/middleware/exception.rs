//! Global exception boundary.
//!
//! Outermost layer. Panics below it become `INTERNAL_ERROR` responses,
//! every error is logged here exactly once, and error statuses with a
//! plain-text or empty body (framework rejections) are rewritten into the
//! uniform shape.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use super::RequestId;
use crate::errors::{error_response, AppError, ErrorReport};

pub async fn exception_boundary(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => AppError::internal(format!(
            "panic while handling {} {}: {}",
            method,
            path,
            panic_message(payload.as_ref())
        ))
        .into_response(),
    };

    settle(response, &method, &path)
}

/// Log the error carried by `response`, if any, and guarantee its body
/// has the uniform error shape.
fn settle(mut response: Response, method: &axum::http::Method, path: &str) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let request_id = response
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string())
        .unwrap_or_default();

    if let Some(report) = response.extensions_mut().remove::<ErrorReport>() {
        log_failure(status, report.kind, &report.detail, method, path, &request_id);
        return response;
    }

    let (kind, message) = classify(status);
    if is_json(&response) {
        log_failure(status, kind, "structured error body", method, path, &request_id);
        return response;
    }
    log_failure(status, kind, "rejected before reaching a handler", method, path, &request_id);

    let mut uniform = error_response(status, kind, message, Vec::new());
    for (name, value) in response.headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            uniform.headers_mut().insert(name.clone(), value.clone());
        }
    }
    uniform
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

fn classify(status: StatusCode) -> (&'static str, &'static str) {
    match status {
        StatusCode::UNAUTHORIZED => ("UNAUTHORIZED", "Authentication required"),
        StatusCode::NOT_FOUND => ("NOT_FOUND", "Resource not found"),
        StatusCode::METHOD_NOT_ALLOWED => ("METHOD_NOT_ALLOWED", "Method not allowed"),
        s if s.is_client_error() => ("BAD_REQUEST", s.canonical_reason().unwrap_or("Bad request")),
        _ => ("INTERNAL_ERROR", "An internal error occurred"),
    }
}

fn log_failure(
    status: StatusCode,
    kind: &str,
    detail: &str,
    method: &axum::http::Method,
    path: &str,
    request_id: &str,
) {
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), kind, detail, %method, path, request_id, "request failed");
    } else {
        tracing::warn!(status = status.as_u16(), kind, detail, %method, path, request_id, "request rejected");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        return text;
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text.as_str();
    }
    "non-string panic payload"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorResponse;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn boom() -> &'static str {
        panic!("kaboom")
    }

    async fn missing() -> Result<&'static str, AppError> {
        Err(AppError::NotFound)
    }

    fn app() -> Router {
        Router::new()
            .route("/boom", get(boom))
            .route("/missing", get(missing))
            .route("/ok", get(|| async { "fine" }))
            .layer(middleware::from_fn(exception_boundary))
    }

    async fn call(uri: &str, method: &str) -> (StatusCode, Option<ErrorResponse>) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).ok())
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let (status, body) = call("/boom", "GET").await;
        let body = body.unwrap();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.kind, "INTERNAL_ERROR");
        assert!(!body.error.message.contains("kaboom"));

        let (status, _) = call("/ok", "GET").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_app_errors_pass_through() {
        let (status, body) = call("/missing", "GET").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.unwrap().error.kind, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_framework_rejections_get_uniform_shape() {
        let (status, body) = call("/nowhere", "GET").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.unwrap().error.status, 404);

        let (status, body) = call("/ok", "DELETE").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body.unwrap().error.kind, "METHOD_NOT_ALLOWED");
    }

    #[test]
    fn test_panic_message_variants() {
        let text: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(panic_message(text.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
