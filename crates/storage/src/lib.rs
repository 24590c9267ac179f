//! Filesystem access for library scans.
//!
//! The scanner never touches `std::fs` or `tokio::fs` directly; it talks to a
//! [`Filesystem`] so that tests can swap the real disk for an in-memory tree
//! (see the `mock` feature) and inject failures such as unreadable folders.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::Filesystem;
pub use crate::models::{DirEntry, FileMeta, WalkEntry};
pub use crate::path::normalize as normalize_path;
use std::sync::Arc;

pub type FsHandle = Arc<dyn Filesystem + Send + Sync>;
