use super::{count_from_column, path_to_column, timestamp_from_column};
use crate::error::{Error, Result};
use std::path::PathBuf;
use time::UtcDateTime;

/// The columns of a title that a scan owns and rewrites on every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRecord {
    pub id: String,
    /// Directory name, as displayed.
    pub name: String,
    /// Lowercased name.
    pub sort_name: String,
    pub path: PathBuf,
}

/// Aggregates written once all chapters of a title have been upserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRollup {
    pub title_id: String,
    pub chapter_count: u32,
    pub page_count: u64,
    /// Latest chapter directory modification time.
    pub last_content_at: Option<UtcDateTime>,
}

/// A title as stored in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub id: String,
    pub name: String,
    pub sort_name: String,
    pub path: PathBuf,
    pub chapter_count: u32,
    pub page_count: u64,
    pub last_content_at: Option<UtcDateTime>,
    pub scanned_at: Option<UtcDateTime>,
    pub cover_page_id: Option<String>,
    pub updated_at: UtcDateTime,
}

/// One page of the library listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleListing {
    pub items: Vec<Title>,
    /// 1-based page number actually used.
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub has_more: bool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct TitleRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) sort_name: String,
    pub(crate) path: String,
    pub(crate) chapter_count: i64,
    pub(crate) page_count: i64,
    pub(crate) last_content_at: Option<i64>,
    pub(crate) scanned_at: Option<i64>,
    pub(crate) cover_page_id: Option<String>,
    pub(crate) updated_at: i64,
}
impl TryFrom<TitleRow> for Title {
    type Error = Error;
    fn try_from(row: TitleRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            name: row.name,
            sort_name: row.sort_name,
            path: PathBuf::from(row.path),
            chapter_count: count_from_column(row.chapter_count, "chapter count")?,
            page_count: count_from_column(row.page_count, "page count")?,
            last_content_at: row
                .last_content_at
                .map(|t| timestamp_from_column(t, "last content date"))
                .transpose()?,
            scanned_at: row.scanned_at.map(|t| timestamp_from_column(t, "scan date")).transpose()?,
            cover_page_id: row.cover_page_id,
            updated_at: timestamp_from_column(row.updated_at, "update date")?,
        })
    }
}
impl TitleRecord {
    pub(crate) fn path_column(&self) -> Result<String> {
        path_to_column(&self.path)
    }
}
