//! Domain layer - Core business entities and logic
//!
//! This module contains the core domain models that represent
//! business concepts independent of infrastructure concerns.

pub mod password;
pub mod product;
pub mod token;
pub mod user;

pub use password::Password;
pub use product::{NewProduct, Product, ProductChanges};
pub use token::{Claims, Credentials, IssuedToken};
pub use user::{User, UserResponse, UserRole};
