//! Repository layer - Data access abstraction
//!
//! One generic [`Repository`] serves every record type; the entities module
//! supplies the record types themselves.

mod base;
pub(crate) mod entities;

pub use base::{Record, Repository, RepositorySlots};
pub(crate) use base::PendingChange;
pub use entities::{ProductRecord, UserRecord};
