use super::{count_from_column, count_to_column, path_to_column, timestamp_from_column};
use crate::error::{Error, Result};
use std::path::PathBuf;
use time::UtcDateTime;

/// A page image, both as written by a scan and as read back.
///
/// `width`, `height` and `checksum` are never filled in by a scan; they are
/// reserved for an enrichment pass and an upsert that leaves them `None`
/// keeps whatever is already stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: String,
    pub chapter_id: String,
    /// Zero-based position within the chapter.
    pub index: u32,
    pub path: PathBuf,
    pub mime: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size: u64,
    pub modified_at: UtcDateTime,
    pub checksum: Option<String>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct PageRow {
    pub(crate) id: String,
    pub(crate) chapter_id: String,
    pub(crate) page_index: i64,
    pub(crate) path: String,
    pub(crate) mime: String,
    pub(crate) width: Option<i64>,
    pub(crate) height: Option<i64>,
    pub(crate) size_bytes: i64,
    pub(crate) modified_at: i64,
    pub(crate) checksum: Option<String>,
}
impl TryFrom<&Page> for PageRow {
    type Error = Error;
    fn try_from(page: &Page) -> Result<Self> {
        Ok(Self {
            id: page.id.clone(),
            chapter_id: page.chapter_id.clone(),
            page_index: count_to_column(page.index, "page index")?,
            path: path_to_column(&page.path)?,
            mime: page.mime.clone(),
            width: page.width.map(i64::from),
            height: page.height.map(i64::from),
            size_bytes: count_to_column(page.size, "file size")?,
            modified_at: page.modified_at.unix_timestamp(),
            checksum: page.checksum.clone(),
        })
    }
}
impl TryFrom<PageRow> for Page {
    type Error = Error;
    fn try_from(row: PageRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            chapter_id: row.chapter_id,
            index: count_from_column(row.page_index, "page index")?,
            path: PathBuf::from(row.path),
            mime: row.mime,
            width: row.width.map(|w| count_from_column(w, "width")).transpose()?,
            height: row.height.map(|h| count_from_column(h, "height")).transpose()?,
            size: count_from_column(row.size_bytes, "file size")?,
            modified_at: timestamp_from_column(row.modified_at, "page modification date")?,
            checksum: row.checksum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_to_row() {
        let page = Page {
            id: "page_abc".to_string(),
            chapter_id: "chapter_abc".to_string(),
            index: 3,
            path: PathBuf::from("/library/Title/Ch01/004.webp"),
            mime: "image/webp".to_string(),
            width: None,
            height: None,
            size: 204_800,
            modified_at: UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            checksum: None,
        };
        let row = PageRow::try_from(&page).unwrap();
        assert_eq!(row.page_index, 3);
        assert_eq!(row.size_bytes, 204_800);
        assert_eq!(row.width, None);
    }

    #[test]
    fn test_parked_row_is_not_a_valid_page() {
        let row = PageRow {
            id: "page_abc".to_string(),
            chapter_id: "chapter_abc".to_string(),
            page_index: -1,
            path: "/library/Title/Ch01/001.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            width: Some(800),
            height: Some(1200),
            size_bytes: 1,
            modified_at: 0,
            checksum: None,
        };
        assert!(Page::try_from(row).is_err());
    }
}
