//! Token service - Issues and revokes bearer tokens.
//!
//! A token is only handed out after it has been registered, so a caller
//! never holds a token the registry does not know about.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{Credentials, IssuedToken};
use crate::errors::{AppError, AppResult};
use crate::infra::{IdentityStore, JwtCodec, TokenRegistry};

/// Token service trait for dependency injection.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Check credentials and issue a registered token.
    async fn authenticate(&self, credentials: Credentials) -> AppResult<IssuedToken>;

    /// Revoke a token. Unknown tokens are ignored.
    fn logout(&self, token: &str);
}

/// Concrete implementation of TokenService over an identity store.
pub struct Authenticator<I: IdentityStore> {
    identities: Arc<I>,
    codec: Arc<JwtCodec>,
    registry: Arc<TokenRegistry>,
}

impl<I: IdentityStore> Authenticator<I> {
    pub fn new(identities: Arc<I>, codec: Arc<JwtCodec>, registry: Arc<TokenRegistry>) -> Self {
        Self {
            identities,
            codec,
            registry,
        }
    }
}

#[async_trait]
impl<I: IdentityStore + 'static> TokenService for Authenticator<I> {
    async fn authenticate(&self, credentials: Credentials) -> AppResult<IssuedToken> {
        let identity = self
            .identities
            .verify_credentials(&credentials.user_name, &credentials.password)
            .await?
            .ok_or_else(|| {
                tracing::info!(user_name = %credentials.user_name, "login rejected");
                AppError::InvalidCredentials
            })?;

        let issued = self.codec.issue(&identity)?;

        if !self
            .registry
            .register(&issued.access_token, identity.id, issued.expires_at)
        {
            return Err(AppError::internal("freshly issued token collided in registry"));
        }

        tracing::info!(user_id = %identity.id, expires_at = %issued.expires_at, "token issued");
        Ok(issued)
    }

    fn logout(&self, token: &str) {
        if self.registry.revoke(token) {
            tracing::info!("token revoked");
        }
    }
}
