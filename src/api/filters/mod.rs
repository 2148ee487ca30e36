//! Ordered request filters run between routing and the handler.
//!
//! Each stage inspects the request before the handler and may veto it by
//! returning an error; the chain renders that error as the final response
//! and the handler never runs. Stages that saw the request get their
//! `on_response` hook called in reverse order on the way out.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::errors::AppError;

mod token;
mod validation;

pub use token::{CurrentUser, TokenValidationFilter};
pub use validation::{collect_violations, ValidationFilter};

/// One stage of the filter chain.
#[async_trait]
pub trait RequestFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pass the (possibly enriched) request on, or short-circuit with an error.
    async fn on_request(&self, request: Request) -> Result<Request, AppError>;

    /// Post-process the response, including short-circuit responses.
    fn on_response(&self, _response: &mut Response) {}
}

/// Filters applied in insertion order.
#[derive(Clone, Default)]
pub struct FilterChain {
    stages: Arc<Vec<Arc<dyn RequestFilter>>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage after the existing ones.
    pub fn with(mut self, filter: impl RequestFilter + 'static) -> Self {
        Arc::make_mut(&mut self.stages).push(Arc::new(filter));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub async fn run(&self, mut request: Request, next: Next) -> Response {
        for (index, stage) in self.stages.iter().enumerate() {
            request = match stage.on_request(request).await {
                Ok(request) => request,
                Err(err) => {
                    tracing::debug!(filter = stage.name(), kind = err.kind(), "request short-circuited");
                    let mut response = err.into_response();
                    for seen in self.stages[..=index].iter().rev() {
                        seen.on_response(&mut response);
                    }
                    return response;
                }
            };
        }

        let mut response = next.run(request).await;
        for stage in self.stages.iter().rev() {
            stage.on_response(&mut response);
        }
        response
    }
}

/// Route layer running the chain held in state.
pub async fn filter_chain_middleware(
    State(chain): State<FilterChain>,
    request: Request,
    next: Next,
) -> Response {
    chain.run(request, next).await
}
