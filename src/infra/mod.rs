//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections, migrations and repositories
//! - Unit of Work for transaction management
//! - Token signing and the live token registry
//! - Identity lookup for authentication

pub mod db;
pub mod identity;
pub mod jwt;
pub mod repositories;
pub mod token_registry;
pub mod unit_of_work;

pub use db::{Database, Migrator};
pub use identity::{Identity, IdentityStore, UserDirectory};
pub use jwt::JwtCodec;
pub use repositories::{ProductRecord, Record, Repository, UserRecord};
pub use token_registry::TokenRegistry;
pub use unit_of_work::{Persistence, UnitOfWork, UnitState};

#[cfg(any(test, feature = "test-utils"))]
pub use identity::MockIdentityStore;
