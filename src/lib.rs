//! Factory API - token-guarded inventory service.
//!
//! Requests pass an exception boundary, a request-context layer, routing,
//! then an ordered filter chain (bearer token, then payload validation)
//! before a handler runs. Handlers call services that persist through a
//! generic repository and unit of work.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core business entities and logic
//! - **services**: Application use cases and business logic
//! - **infra**: Database, repositories, unit of work, tokens
//! - **api**: HTTP handlers, filters, middleware, and routes
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Password, User, UserRole};
pub use errors::{AppError, AppResult};
pub use infra::{Persistence, TokenRegistry, UnitOfWork};
