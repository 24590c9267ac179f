//! Error types for the [`scan`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// A scan error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a scan failure.
///
/// ### Skippable Errors
/// - [`ErrorKind::Filesystem`]: a root, title or chapter could not be read.
///   The scanner logs these and moves on to the next sibling.
///
/// ### Fatal Errors
/// - [`ErrorKind::Index`]: a write to the index failed. The current title is
///   rolled back and (by default) the scan stops.
/// - [`ErrorKind::Cancelled`]: the caller asked the scan to stop.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("filesystem error")]
    Filesystem,
    #[display("index error")]
    Index,
    #[display("scan cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Filesystem | Self::Index => true,
            Self::Cancelled => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
