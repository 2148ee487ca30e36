//! Service Container - Centralized service access.
//!
//! Wires the concrete services over one database connection, one token
//! codec and the shared token registry.

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use super::{
    Authenticator, ProductManager, ProductService, TokenService, UserManager, UserService,
};
use crate::infra::{JwtCodec, Persistence, TokenRegistry, UserDirectory};

/// Service container trait for dependency injection.
pub trait ServiceContainer: Send + Sync {
    fn tokens(&self) -> Arc<dyn TokenService>;

    fn users(&self) -> Arc<dyn UserService>;

    fn products(&self) -> Arc<dyn ProductService>;
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    token_service: Arc<dyn TokenService>,
    user_service: Arc<dyn UserService>,
    product_service: Arc<dyn ProductService>,
}

impl Services {
    pub fn new(
        token_service: Arc<dyn TokenService>,
        user_service: Arc<dyn UserService>,
        product_service: Arc<dyn ProductService>,
    ) -> Self {
        Self {
            token_service,
            user_service,
            product_service,
        }
    }

    /// Build every service over `db`, issuing tokens into `registry`.
    pub fn from_connection(
        db: DatabaseConnection,
        codec: Arc<JwtCodec>,
        registry: Arc<TokenRegistry>,
    ) -> Self {
        let persistence = Arc::new(Persistence::new(db.clone()));
        let directory = Arc::new(UserDirectory::new(db));

        Self {
            token_service: Arc::new(Authenticator::new(directory.clone(), codec, registry)),
            user_service: Arc::new(UserManager::new(persistence.clone(), directory)),
            product_service: Arc::new(ProductManager::new(persistence)),
        }
    }
}

impl ServiceContainer for Services {
    fn tokens(&self) -> Arc<dyn TokenService> {
        self.token_service.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }

    fn products(&self) -> Arc<dyn ProductService> {
        self.product_service.clone()
    }
}
