//! Local filesystem backend.
//!
//! Uses `tokio::fs` for async I/O. Listing and walking are done with an
//! explicit directory stack rather than recursion so that deep chapter trees
//! don't need boxed recursive futures. Listings follow symlinks, but a walk
//! never descends into a symlinked directory, so link cycles and links that
//! point back up the tree cannot pull in outside files.

use crate::backend::WalkStream;
use crate::error::{ErrorKind, Result};
use crate::models::{DirEntry, FileMeta, WalkEntry};
use crate::Filesystem;
use async_stream::stream;
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::fs;

/// Local filesystem.
///
/// # Examples
///
/// ```no_run
/// use shelf_storage::backend::LocalFilesystem;
/// use shelf_storage::Filesystem;
/// use std::path::Path;
///
/// # async fn example() -> shelf_storage::error::Result<()> {
/// let fs = LocalFilesystem::new("local");
/// let titles = fs.list_dir(Path::new("/srv/manga")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    name: String,
}
impl LocalFilesystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn file_meta(path: &Path, metadata: Metadata) -> Result<FileMeta> {
        let modified = metadata.modified().map_err(|e| ErrorKind::from_io(e, path))?;
        Ok(FileMeta {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: UtcDateTime::from(modified),
            is_dir: metadata.is_dir(),
        })
    }

    /// Resolve a directory entry, following symlinks the same way `stat`
    /// would. Broken symlinks resolve to `None` and are silently dropped by
    /// callers.
    async fn resolve(entry: &fs::DirEntry) -> Result<Option<Listed>> {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| ErrorKind::from_io(e, &path))?;
        if !file_type.is_symlink() {
            return Ok(Some(Listed { entry: DirEntry::new(path, file_type.is_dir()), linked: false }));
        }
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(Some(Listed { entry: DirEntry::new(path, metadata.is_dir()), linked: true })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ErrorKind::from_io(e, &path).into()),
        }
    }

    async fn read_dir(path: &Path) -> Result<Vec<Listed>> {
        let mut entries = fs::read_dir(path).await.map_err(|e| ErrorKind::from_io(e, path))?;
        let mut listed = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| ErrorKind::from_io(e, path))? {
            if let Some(resolved) = Self::resolve(&entry).await? {
                listed.push(resolved);
            }
        }
        listed.sort_by(|a, b| a.entry.path.file_name().cmp(&b.entry.path.file_name()));
        Ok(listed)
    }
}

/// A listed entry and whether it was reached through a symlink.
struct Listed {
    entry: DirEntry,
    linked: bool,
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        Ok(Self::read_dir(path).await?.into_iter().map(|listed| listed.entry).collect())
    }

    async fn stat(&self, path: &Path) -> Result<FileMeta> {
        let metadata = fs::metadata(path).await.map_err(|e| ErrorKind::from_io(e, path))?;
        Self::file_meta(path, metadata)
    }

    fn walk<'a>(&'a self, path: &'a Path) -> WalkStream<'a> {
        let mut stack: Vec<PathBuf> = vec![path.to_path_buf()];
        Box::pin(stream! {
            while let Some(current) = stack.pop() {
                let entries = match Self::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        yield Err(e);
                        continue;
                    },
                };
                // Reversed so that subdirectories pop off the stack in name order.
                let mut descend = Vec::new();
                for Listed { entry, linked } in entries {
                    // Linked directories are reported but never entered.
                    if entry.is_dir && !linked {
                        descend.push(entry.path.clone());
                    }
                    yield Ok(WalkEntry { path: entry.path, is_dir: entry.is_dir });
                }
                stack.extend(descend.into_iter().rev());
            }
        })
    }
}
