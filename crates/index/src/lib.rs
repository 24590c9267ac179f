//! SQLite index of a comic library.
//!
//! The index holds three levels of entities (titles, chapters and pages),
//! each identified by a stable ID derived from its path and unique by that
//! path. Scans write through the [`Store`]/[`UnitOfWork`] seam, one
//! transaction per title; readers go through [`Repository`] directly.

mod db;
pub mod error;
pub mod models;
mod repo;
mod store;

pub use crate::db::Database;
pub use crate::repo::{DEFAULT_LISTING_LIMIT, MAX_LISTING_LIMIT, Repository};
pub use crate::store::{Store, StoreHandle, UnitOfWork};
