//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. Writes go through a Unit of Work per call.

pub mod container;
mod product_service;
mod token_service;
mod user_service;

pub use container::{ServiceContainer, Services};

pub use product_service::{ProductManager, ProductService};
pub use token_service::{Authenticator, TokenService};
pub use user_service::{UserManager, UserService};
