//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Database, JwtCodec, TokenRegistry};
use crate::services::{ProductService, ServiceContainer, Services, TokenService, UserService};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    pub token_service: Arc<dyn TokenService>,
    pub user_service: Arc<dyn UserService>,
    pub product_service: Arc<dyn ProductService>,
    /// Live tokens, shared by the token service and the token filter
    pub tokens: Arc<TokenRegistry>,
    pub database: Arc<Database>,
}

impl AppState {
    /// Build the full service graph over `database`.
    pub fn from_config(database: Arc<Database>, config: &Config) -> Self {
        let codec = Arc::new(JwtCodec::from_config(config));
        let tokens = Arc::new(TokenRegistry::new(codec.clone()));
        let services = Services::from_connection(database.get_connection(), codec, tokens.clone());

        Self::new(&services, tokens, database)
    }

    /// Create state from an already assembled container.
    pub fn new(
        services: &dyn ServiceContainer,
        tokens: Arc<TokenRegistry>,
        database: Arc<Database>,
    ) -> Self {
        Self {
            token_service: services.tokens(),
            user_service: services.users(),
            product_service: services.products(),
            tokens,
            database,
        }
    }
}
