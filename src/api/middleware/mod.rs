//! API middleware.
//!
//! Layered outermost first: the exception boundary, then request context,
//! then routing and the filter chain.

mod exception;
mod request;

pub use exception::exception_boundary;
pub use request::{request_context, RequestId};
