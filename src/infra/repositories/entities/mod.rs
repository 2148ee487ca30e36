//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod product;
pub mod user;

pub use product::Model as ProductRecord;
pub use user::Model as UserRecord;
