//! Filesystem models.
//!
//! Plain values handed from a [`Filesystem`](crate::Filesystem) to the
//! scanner. Paths are always the full path of the entry (the directory that
//! was listed joined with the entry name), never relative to a library root.

use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}
impl DirEntry {
    pub fn new(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self { path: path.into(), is_dir }
    }

    /// Final component of the entry path, lossily converted for display and
    /// sorting.
    pub fn name(&self) -> String {
        file_name(&self.path)
    }
}

/// One entry produced by a recursive walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Result of a `stat` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub path: PathBuf,
    /// Size in bytes (zero for directories on some platforms)
    pub size: u64,
    /// Last modification time, normalized to UTC
    pub modified: UtcDateTime,
    pub is_dir: bool,
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
