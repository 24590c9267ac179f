use super::{count_from_column, count_to_column, path_to_column, timestamp_from_column};
use crate::error::{Error, Result};
use std::path::PathBuf;
use time::UtcDateTime;

/// A chapter, both as written by a scan and as read back.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub id: String,
    pub title_id: String,
    /// Directory name, as displayed.
    pub name: String,
    /// Chapter number parsed from the name, if there was one.
    pub number: Option<f64>,
    pub path: PathBuf,
    pub page_count: u32,
    /// Modification time of the chapter directory itself.
    pub modified_at: UtcDateTime,
}

#[derive(sqlx::FromRow)]
pub(crate) struct ChapterRow {
    pub(crate) id: String,
    pub(crate) title_id: String,
    pub(crate) name: String,
    pub(crate) number: Option<f64>,
    pub(crate) path: String,
    pub(crate) page_count: i64,
    pub(crate) modified_at: i64,
}
impl TryFrom<&Chapter> for ChapterRow {
    type Error = Error;
    fn try_from(chapter: &Chapter) -> Result<Self> {
        Ok(Self {
            id: chapter.id.clone(),
            title_id: chapter.title_id.clone(),
            name: chapter.name.clone(),
            number: chapter.number,
            path: path_to_column(&chapter.path)?,
            page_count: count_to_column(chapter.page_count, "page count")?,
            modified_at: chapter.modified_at.unix_timestamp(),
        })
    }
}
impl TryFrom<ChapterRow> for Chapter {
    type Error = Error;
    fn try_from(row: ChapterRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            title_id: row.title_id,
            name: row.name,
            number: row.number,
            path: PathBuf::from(row.path),
            page_count: count_from_column(row.page_count, "page count")?,
            modified_at: timestamp_from_column(row.modified_at, "chapter modification date")?,
        })
    }
}
