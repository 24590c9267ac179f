//! In-memory filesystem for testing.

use super::WalkStream;
use crate::error::{ErrorKind, Result};
use crate::models::{DirEntry, FileMeta, WalkEntry};
use crate::path::normalize;
use crate::Filesystem;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
enum Node {
    Dir(UtcDateTime),
    File(UtcDateTime, u64),
}

/// In-memory filesystem for testing.
///
/// Directories are created implicitly for every ancestor of an added file.
/// Paths registered with [`with_failure()`](Self::with_failure) (or
/// [`fail()`](Self::fail) after construction) answer every operation with
/// [`PermissionDenied`](ErrorKind::PermissionDenied), which is how tests
/// simulate unreadable roots and chapters.
///
/// # Examples
///
/// ```
/// use shelf_storage::backend::MockFilesystem;
/// use shelf_storage::Filesystem;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fs = MockFilesystem::with_files([
///     ("/lib/Berserk/Ch01/01.jpg", b"jpeg".to_vec()),
///     ("/lib/Berserk/Ch01/02.jpg", b"jpeg".to_vec()),
/// ])
/// .with_dir("/lib/Empty");
/// let titles = fs.list_dir(Path::new("/lib")).await?;
/// assert_eq!(titles.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct MockFilesystem {
    name: String,
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    failures: RwLock<HashSet<PathBuf>>,
}

impl MockFilesystem {
    /// Create a mock filesystem pre-populated with files (and, implicitly,
    /// their parent directories).
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let now = UtcDateTime::now();
        let mut fs = Self {
            name: "mock".to_string(),
            nodes: RwLock::new(BTreeMap::new()),
            failures: RwLock::new(HashSet::new()),
        };
        for (path, data) in files {
            let size = data.into().len() as u64;
            fs = fs.with_file_at(path, size, now);
        }
        fs
    }

    /// Add an (empty) directory and its ancestors.
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        let path = normalize(path.into());
        Self::insert_ancestors(self.nodes.get_mut(), &path, UtcDateTime::now());
        self.nodes.get_mut().insert(path, Node::Dir(UtcDateTime::now()));
        self
    }

    /// Add a file with an explicit size and modification time.
    pub fn with_file_at(mut self, path: impl Into<PathBuf>, size: u64, modified: UtcDateTime) -> Self {
        let path = normalize(path.into());
        Self::insert_ancestors(self.nodes.get_mut(), &path, modified);
        self.nodes.get_mut().insert(path, Node::File(modified, size));
        self
    }

    /// Make every operation on `path` fail with a permission error.
    pub fn with_failure(mut self, path: impl Into<PathBuf>) -> Self {
        self.failures.get_mut().insert(normalize(path.into()));
        self
    }

    /// Make every operation on `path` fail from now on.
    pub async fn fail(&self, path: impl Into<PathBuf>) {
        self.failures.write().await.insert(normalize(path.into()));
    }

    fn insert_ancestors(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path, modified: UtcDateTime) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir(modified));
        }
    }

    async fn check(&self, path: &Path) -> Result<()> {
        if self.failures.read().await.contains(path) {
            exn::bail!(ErrorKind::PermissionDenied(path.to_path_buf()));
        }
        Ok(())
    }
}
impl Default for MockFilesystem {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl Filesystem for MockFilesystem {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = normalize(path);
        self.check(&path).await?;
        let nodes = self.nodes.read().await;
        match nodes.get(&path) {
            Some(Node::Dir(_)) => {},
            Some(Node::File(..)) => exn::bail!(ErrorKind::NotADirectory(path)),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
        Ok(nodes
            .iter()
            .filter(|(child, _)| child.parent() == Some(path.as_path()))
            .map(|(child, node)| DirEntry::new(child.clone(), matches!(node, Node::Dir(_))))
            .collect())
    }

    async fn stat(&self, path: &Path) -> Result<FileMeta> {
        let path = normalize(path);
        self.check(&path).await?;
        let node = self.nodes.read().await.get(&path).copied();
        let (modified, size, is_dir) = match node {
            Some(Node::Dir(modified)) => (modified, 0, true),
            Some(Node::File(modified, size)) => (modified, size, false),
            None => exn::bail!(ErrorKind::NotFound(path)),
        };
        Ok(FileMeta { path, size, modified, is_dir })
    }

    fn walk<'a>(&'a self, path: &'a Path) -> WalkStream<'a> {
        let mut stack = vec![normalize(path)];
        Box::pin(stream! {
            while let Some(current) = stack.pop() {
                let entries = match self.list_dir(&current).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        yield Err(e);
                        continue;
                    },
                };
                let mut descend = Vec::new();
                for entry in entries {
                    if entry.is_dir {
                        descend.push(entry.path.clone());
                    }
                    yield Ok(WalkEntry { path: entry.path, is_dir: entry.is_dir });
                }
                stack.extend(descend.into_iter().rev());
            }
        })
    }
}
