//! Chapter collection.
//!
//! Turns one chapter directory into an ordered list of pages: every image
//! anywhere below the directory, naturally sorted by file name and numbered
//! from zero.

use crate::identity::{EntityKind, stable_id};
use crate::number::chapter_number;
use crate::order::natural_cmp;
use crate::scan::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::TryStreamExt;
use shelf_index::models::{Chapter, Page};
use shelf_storage::{Filesystem, normalize_path};
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// Image formats that count as pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// A chapter directory and its pages, ready to be written to the index
/// under any title.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedChapter {
    pub id: String,
    pub name: String,
    pub number: Option<f64>,
    pub path: PathBuf,
    pub modified_at: UtcDateTime,
    /// Pages in reading order; `pages[i].index == i`.
    pub pages: Vec<Page>,
}

impl CollectedChapter {
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    pub fn to_chapter(&self, title_id: impl Into<String>) -> Chapter {
        Chapter {
            id: self.id.clone(),
            title_id: title_id.into(),
            name: self.name.clone(),
            number: self.number,
            path: self.path.clone(),
            page_count: self.page_count(),
            modified_at: self.modified_at,
        }
    }
}

/// Collect the pages of the chapter directory at `path`.
///
/// Files that are not images are ignored, and so are images whose path is not
/// valid UTF-8 (the index stores paths as text). Any error while walking the
/// directory or reading metadata fails the whole chapter.
pub async fn collect_chapter(fs: &dyn Filesystem, path: impl AsRef<Path>) -> Result<CollectedChapter> {
    let path = normalize_path(path.as_ref());
    let id = stable_id(EntityKind::Chapter, &path);

    let mut pages = Vec::new();
    let mut walk = fs.walk(&path);
    while let Some(entry) = walk.try_next().await.or_raise(|| ErrorKind::Filesystem)? {
        if entry.is_dir {
            continue;
        }
        let Some(format) = ImageFormat::from_path(&entry.path) else {
            continue;
        };
        if entry.path.to_str().is_none() {
            tracing::warn!(page = %entry.path.display(), "Page path is not valid UTF-8; skipping");
            continue;
        }
        let meta = fs.stat(&entry.path).await.or_raise(|| ErrorKind::Filesystem)?;
        let page_path = normalize_path(&entry.path);
        pages.push(Page {
            id: stable_id(EntityKind::Page, &page_path),
            chapter_id: id.clone(),
            index: 0,
            path: page_path,
            mime: format.mime().to_string(),
            width: None,
            height: None,
            size: meta.size,
            modified_at: meta.modified,
            checksum: None,
        });
    }
    drop(walk);

    pages.sort_by(|a, b| natural_cmp(&base_name(&a.path), &base_name(&b.path)).then_with(|| a.path.cmp(&b.path)));
    for (index, page) in pages.iter_mut().enumerate() {
        page.index = u32::try_from(index).or_raise(|| ErrorKind::Filesystem)?;
    }

    let meta = fs.stat(&path).await.or_raise(|| ErrorKind::Filesystem)?;
    let name = base_name(&path);
    Ok(CollectedChapter {
        id,
        number: chapter_number(&name),
        name,
        path,
        modified_at: meta.modified,
        pages,
    })
}

fn base_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
