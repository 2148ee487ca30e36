//! Request context middleware.
//!
//! Propagates or assigns the correlation id, opens the `request` span and
//! times the request.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{MAX_REQUEST_ID_LENGTH, REQUEST_ID_HEADER};

/// Correlation id of the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(Arc<str>);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().into())
    }

    /// Reuse an inbound id if it is printable and not too long.
    fn from_header(value: &HeaderValue) -> Option<Self> {
        value
            .to_str()
            .ok()
            .map(str::trim)
            .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LENGTH)
            .map(|s| Self(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Logs requests that never reached a response, e.g. client disconnects.
struct InFlight<'a> {
    id: &'a RequestId,
    started: Instant,
    done: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            tracing::warn!(
                request_id = %self.id.as_str(),
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "request abandoned before completion"
            );
        }
    }
}

pub async fn request_context(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(RequestId::from_header)
        .unwrap_or_else(RequestId::generate);

    let span = tracing::info_span!(
        "request",
        request_id = %request_id.as_str(),
        method = %request.method(),
        path = %request.uri().path(),
    );

    request.extensions_mut().insert(request_id.clone());

    async move {
        let mut guard = InFlight {
            id: &request_id,
            started: Instant::now(),
            done: false,
        };

        let mut response = next.run(request).await;
        guard.done = true;

        let elapsed_ms = guard.started.elapsed().as_millis() as u64;
        tracing::info!(status = response.status().as_u16(), elapsed_ms, "request completed");

        if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        response.extensions_mut().insert(request_id.clone());
        response
    }
    .instrument(span)
    .await
}
