//! The write contract a library scan depends on.
//!
//! A scan reconciles one title at a time: it opens a [`UnitOfWork`], upserts
//! the title, each qualifying chapter and all of its pages, writes the
//! title's rollup, then commits. Dropping or rolling back the unit of work
//! discards everything written through it.

use crate::error::Result;
use crate::models::{Chapter, Page, TitleRecord, TitleRollup};
use async_trait::async_trait;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn Store + Send + Sync>;

/// Something that can open units of work against the index.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

/// A single all-or-nothing batch of index writes.
///
/// Every upsert is keyed by the entity's path (the uniqueness constraint),
/// not its ID, and only touches the columns a scan computes. Columns owned by
/// other parts of the system (a title's cover, reading progress) survive.
///
/// Implementations that drop an uncommitted unit of work must discard its
/// writes, as if [`rollback()`](Self::rollback) had been called.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Insert or update a title's name, sort key and path.
    async fn upsert_title(&mut self, title: &TitleRecord) -> Result<()>;

    /// Insert or update a chapter.
    ///
    /// Upserting a chapter also releases the page indices currently held by
    /// its stored pages, so that the pages written after it can take any
    /// index without tripping the `(chapter, index)` uniqueness constraint.
    async fn upsert_chapter(&mut self, chapter: &Chapter) -> Result<()>;

    /// Insert or update a page. Its chapter must have been upserted earlier
    /// in the same unit of work.
    async fn upsert_page(&mut self, page: &Page) -> Result<()>;

    /// Write a title's aggregate counts.
    ///
    /// Pages of the title's re-scanned chapters that were not upserted again
    /// (their files are gone) are removed here.
    async fn finalize_title(&mut self, rollup: &TitleRollup) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
