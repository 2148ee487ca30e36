//! Bearer token filter.

use async_trait::async_trait;
use axum::{
    extract::{MatchedPath, Request},
    http::{header::WWW_AUTHENTICATE, HeaderValue, Method, StatusCode},
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::RequestFilter;
use crate::domain::UserRole;
use crate::errors::AppError;
use crate::infra::TokenRegistry;

/// Authenticated caller, attached to the request by [`TokenValidationFilter`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub user_name: String,
    pub role: UserRole,
    /// The raw bearer token the request was authenticated with
    pub token: String,
}

/// Rejects requests without a registered, live bearer token.
///
/// Routes marked anonymous skip the check entirely.
pub struct TokenValidationFilter {
    registry: Arc<TokenRegistry>,
    anonymous: HashSet<(Method, String)>,
}

impl TokenValidationFilter {
    pub fn new(registry: Arc<TokenRegistry>) -> Self {
        Self {
            registry,
            anonymous: HashSet::new(),
        }
    }

    /// Let `method path` through without a token. `path` is the route
    /// pattern, e.g. `/api/auth/login`.
    pub fn allow_anonymous(mut self, method: Method, path: impl Into<String>) -> Self {
        self.anonymous.insert((method, path.into()));
        self
    }

    fn is_anonymous(&self, request: &Request) -> bool {
        let path = request
            .extensions()
            .get::<MatchedPath>()
            .map(|matched| matched.as_str())
            .unwrap_or_else(|| request.uri().path());
        self.anonymous
            .contains(&(request.method().clone(), path.to_string()))
    }
}

#[async_trait]
impl RequestFilter for TokenValidationFilter {
    fn name(&self) -> &'static str {
        "token_validation"
    }

    async fn on_request(&self, mut request: Request) -> Result<Request, AppError> {
        if self.is_anonymous(&request) {
            return Ok(request);
        }

        let token = request
            .headers()
            .typed_get::<Authorization<Bearer>>()
            .map(|header| header.token().to_string())
            .ok_or(AppError::Unauthorized)?;

        let claims = self.registry.validate(&token).ok_or(AppError::Unauthorized)?;

        request.extensions_mut().insert(CurrentUser {
            id: claims.sub,
            user_name: claims.name,
            role: UserRole::from(claims.role.as_str()),
            token,
        });
        Ok(request)
    }

    fn on_response(&self, response: &mut Response) {
        if response.status() == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
    }
}
