//! Library scans.
//!
//! The entry point is [`Scanner::scan()`], which walks every configured root
//! (`root/<title>/<chapter>/<pages>`) in a deterministic order and writes
//! each title that has at least one non-empty chapter to the index in its
//! own transaction. Unreadable roots, titles and chapters are logged and
//! skipped; a failed index write rolls back its title and, under the default
//! [`TitleFailurePolicy`], ends the scan.

pub mod error;
mod scanner;

pub use self::scanner::{ScanStats, Scanner, TitleFailurePolicy};
