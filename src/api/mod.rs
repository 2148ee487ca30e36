//! API layer - HTTP handlers, filters and middleware
//!
//! This module contains all HTTP-related concerns:
//! - Request handlers
//! - The ordered filter chain (token, then payload validation)
//! - Middleware (exception boundary, request context)
//! - Route definitions

pub mod filters;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
