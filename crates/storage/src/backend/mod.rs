//! Filesystem trait and implementations.
//!
//! The scanner needs three things from a filesystem: the immediate children
//! of a directory, metadata for a single path, and a recursive walk that
//! reports errors per entry instead of giving up on the first one.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalFilesystem;
#[cfg(feature = "mock")]
pub use self::mock::MockFilesystem;
use crate::error::Result;
use crate::models::{DirEntry, FileMeta, WalkEntry};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub type WalkStream<'a> = Pin<Box<dyn Stream<Item = Result<WalkEntry>> + Send + 'a>>;

/// Read-only view of a filesystem, as consumed by the scanner.
///
/// All paths are full paths (library roots are configured as absolute paths,
/// and everything below them is joined onto them).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use shelf_storage::{Filesystem, error::Result};
///
/// async fn count_subdirectories(fs: &dyn Filesystem, root: &Path) -> Result<usize> {
///     let entries = fs.list_dir(root).await?;
///     Ok(entries.iter().filter(|e| e.is_dir).count())
/// }
/// ```
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Name of the filesystem implementation (used for logging only).
    fn name(&self) -> &str;

    /// List the immediate children of a directory.
    ///
    /// Entries are returned sorted by file name so that listings are
    /// deterministic regardless of the underlying platform. Returns
    /// [`NotFound`](crate::error::ErrorKind::NotFound) if the directory does
    /// not exist.
    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Get metadata for a single file or directory without reading it.
    async fn stat(&self, path: &Path) -> Result<FileMeta>;

    /// Recursively walk everything below `path` (not including `path`
    /// itself).
    ///
    /// Unlike [`list_dir()`](Self::list_dir), a directory that cannot be read
    /// is yielded as an error item and the walk carries on with the rest of
    /// the tree; it is up to the consumer to decide whether one bad entry
    /// poisons the whole walk.
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use shelf_storage::{Filesystem, error::Result};
    /// # async fn example(fs: &dyn Filesystem) -> Result<()> {
    /// let mut walk = fs.walk(Path::new("/library/Berserk/Vol 01"));
    /// while let Some(entry) = walk.try_next().await? {
    ///     println!("{} (dir: {})", entry.path.display(), entry.is_dir);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn walk<'a>(&'a self, path: &'a Path) -> WalkStream<'a>;

    /// Collect a [`walk()`](Self::walk) into a [`Vec`], failing on the first
    /// error.
    async fn walk_all(&self, path: &Path) -> Result<Vec<WalkEntry>> {
        self.walk(path).try_collect().await
    }
}
