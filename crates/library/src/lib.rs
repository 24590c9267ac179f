//! Library scanning engine.
//!
//! A library is one or more root folders laid out as
//! `root/<title>/<chapter>/<page images>`. [`Scanner`] walks that hierarchy
//! and reconciles what it finds into the index, one transaction per title.
//! The remaining modules are the pure building blocks the scan is made of.

pub mod collect;
pub mod error;
pub mod identity;
pub mod number;
pub mod order;
pub mod scan;

pub use crate::identity::{EntityKind, stable_id};
pub use crate::scan::{ScanStats, Scanner, TitleFailurePolicy};
