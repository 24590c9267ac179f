//! Index models.
//!
//! The public types are what the scanner writes and what readers get back.
//! Each one has a crate-private `*Row` twin that mirrors the SQLite columns
//! (integers for counts, unix timestamps for times, strings for paths).

mod chapter;
mod page;
mod title;

pub use self::chapter::Chapter;
pub(crate) use self::chapter::ChapterRow;
pub use self::page::Page;
pub(crate) use self::page::PageRow;
pub use self::title::{Title, TitleListing, TitleRecord, TitleRollup};
pub(crate) use self::title::TitleRow;

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::path::Path;
use time::UtcDateTime;

/// Row counts across the whole index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct LibraryStats {
    pub titles: i64,
    pub chapters: i64,
    pub pages: i64,
}

pub(crate) fn path_to_column(path: &Path) -> Result<String> {
    Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.to_string())
}

pub(crate) fn timestamp_from_column(value: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp(value).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn count_from_column<T: TryFrom<i64>>(value: i64, field: &'static str) -> Result<T>
where
    T::Error: std::error::Error + Send + Sync + 'static,
{
    T::try_from(value).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn count_to_column<T: TryInto<i64>>(value: T, field: &'static str) -> Result<i64>
where
    T::Error: std::error::Error + Send + Sync + 'static,
{
    value.try_into().or_raise(|| ErrorKind::InvalidData(field))
}
