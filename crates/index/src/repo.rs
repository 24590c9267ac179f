//! Repository for the title/chapter/page index.
//!
//! Writes go through [`Store::begin`] and the returned unit of work (one
//! SQLite transaction per title); reads are plain queries against the pool
//! and only ever observe committed titles.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{
    Chapter, ChapterRow, LibraryStats, Page, PageRow, Title, TitleListing, TitleRecord, TitleRollup, TitleRow,
    count_to_column, path_to_column,
};
use crate::store::{Store, UnitOfWork};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use time::UtcDateTime;

/// Default number of titles per listing page.
pub const DEFAULT_LISTING_LIMIT: u32 = 60;
/// Upper bound on titles per listing page.
pub const MAX_LISTING_LIMIT: u32 = 200;

/// Repository for managing titles, chapters and pages in the index database.
///
/// # Relationships
///
/// - A title has many chapters, a chapter has many pages.
/// - Deleting a title cascades to its chapters, their pages and any reading
///   progress (the scanner itself never deletes titles or chapters).
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    ///
    /// In dry-run mode every unit of work is rolled back instead of
    /// committed, so a scan exercises all of its writes without keeping any.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    pub async fn get_title(&self, id: impl AsRef<str>) -> Result<Option<Title>> {
        let row: Option<TitleRow> = sqlx::query_as(include_str!("../queries/get_title.sql"))
            .bind(id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Title::try_from).transpose()
    }

    /// Get a title by the (normalized) path of its directory.
    pub async fn get_title_by_path(&self, path: impl AsRef<Path>) -> Result<Option<Title>> {
        let row: Option<TitleRow> = sqlx::query_as(include_str!("../queries/get_title_by_path.sql"))
            .bind(path_to_column(path.as_ref())?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Title::try_from).transpose()
    }

    /// Chapters of a title, by chapter number (unnumbered last), then name.
    pub async fn list_chapters(&self, title_id: impl AsRef<str>) -> Result<Vec<Chapter>> {
        let rows: Vec<ChapterRow> = sqlx::query_as(include_str!("../queries/list_chapters.sql"))
            .bind(title_id.as_ref())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Chapter::try_from).collect()
    }

    /// Pages of a chapter in reading order.
    pub async fn list_pages(&self, chapter_id: impl AsRef<str>) -> Result<Vec<Page>> {
        let rows: Vec<PageRow> = sqlx::query_as(include_str!("../queries/list_pages.sql"))
            .bind(chapter_id.as_ref())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Page::try_from).collect()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// List titles, most recently updated first.
    ///
    /// `page` is 1-based. Zero for either argument falls back to the
    /// defaults, and `limit` is capped at [`MAX_LISTING_LIMIT`].
    pub async fn list_titles(&self, page: u32, limit: u32) -> Result<TitleListing> {
        let page = if page == 0 { 1 } else { page };
        let limit = match limit {
            0 => DEFAULT_LISTING_LIMIT,
            l => l.min(MAX_LISTING_LIMIT),
        };
        let offset = u64::from(page - 1) * u64::from(limit);
        let total: i64 = sqlx::query_scalar(include_str!("../queries/count_titles.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let rows: Vec<TitleRow> = sqlx::query_as(include_str!("../queries/list_titles.sql"))
            .bind(i64::from(limit))
            .bind(count_to_column(offset, "offset")?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let items = rows.into_iter().map(Title::try_from).collect::<Result<Vec<_>>>()?;
        let total = u64::try_from(total).or_raise(|| ErrorKind::InvalidData("title count"))?;
        let has_more = offset + (items.len() as u64) < total;
        Ok(TitleListing { items, page, limit, total, has_more })
    }

    pub async fn stats(&self) -> Result<LibraryStats> {
        sqlx::query_as(include_str!("../queries/stats.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }
}

#[async_trait]
impl Store for Repository {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        Ok(Box::new(SqliteUnitOfWork { tx, dry_run: self.dry_run }))
    }
}

/// One SQLite transaction. sqlx rolls the transaction back if it is dropped
/// without being committed.
struct SqliteUnitOfWork {
    tx: Transaction<'static, Sqlite>,
    dry_run: bool,
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn upsert_title(&mut self, title: &TitleRecord) -> Result<()> {
        sqlx::query(include_str!("../queries/upsert_title.sql"))
            .bind(&title.id)
            .bind(&title.name)
            .bind(&title.sort_name)
            .bind(title.path_column()?)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn upsert_chapter(&mut self, chapter: &Chapter) -> Result<()> {
        let row = ChapterRow::try_from(chapter)?;
        sqlx::query(include_str!("../queries/upsert_chapter.sql"))
            .bind(&row.id)
            .bind(row.title_id)
            .bind(row.name)
            .bind(row.number)
            .bind(row.path)
            .bind(row.page_count)
            .bind(row.modified_at)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        // Park existing indices as negatives. The row ID is only equal to the
        // stored one when the path is, which the upsert above guarantees.
        sqlx::query(include_str!("../queries/park_pages.sql"))
            .bind(row.id)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn upsert_page(&mut self, page: &Page) -> Result<()> {
        let row = PageRow::try_from(page)?;
        sqlx::query(include_str!("../queries/upsert_page.sql"))
            .bind(row.id)
            .bind(row.chapter_id)
            .bind(row.page_index)
            .bind(row.path)
            .bind(row.mime)
            .bind(row.width)
            .bind(row.height)
            .bind(row.size_bytes)
            .bind(row.modified_at)
            .bind(row.checksum)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn finalize_title(&mut self, rollup: &TitleRollup) -> Result<()> {
        sqlx::query(include_str!("../queries/prune_parked_pages.sql"))
            .bind(&rollup.title_id)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/finalize_title.sql"))
            .bind(&rollup.title_id)
            .bind(i64::from(rollup.chapter_count))
            .bind(count_to_column(rollup.page_count, "page count")?)
            .bind(rollup.last_content_at.map(|t| t.unix_timestamp()))
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if self.dry_run {
            return self.tx.rollback().await.or_raise(|| ErrorKind::Database);
        }
        self.tx.commit().await.or_raise(|| ErrorKind::Database)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.or_raise(|| ErrorKind::Database)
    }
}
