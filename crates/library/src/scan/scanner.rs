use crate::collect::{CollectedChapter, collect_chapter};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::identity::{EntityKind, stable_id};
use crate::order::directory_cmp;
use crate::scan::error::{ErrorKind, Result};
use exn::ResultExt;
use shelf_index::models::{TitleRecord, TitleRollup};
use shelf_index::{StoreHandle, UnitOfWork};
use shelf_storage::{DirEntry, FsHandle, normalize_path};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, instrument};

/// What to do when writing a title to the index fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitleFailurePolicy {
    /// Roll the title back and stop the scan with an error.
    #[default]
    Abort,
    /// Roll the title back, log the failure and carry on with the next one.
    Skip,
}

/// Counts of what a scan wrote to the index (or, in a dry run, would have).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Roots that could be listed.
    pub roots: u64,
    /// Titles committed.
    pub titles: u64,
    /// Chapters committed.
    pub chapters: u64,
    /// Pages committed.
    pub pages: u64,
    /// Roots that could not be listed.
    pub skipped_roots: u64,
    /// Titles whose chapter folders could not be listed.
    pub skipped_titles: u64,
    /// Chapters that could not be collected.
    pub skipped_chapters: u64,
    /// Titles rolled back under [`TitleFailurePolicy::Skip`].
    pub failed_titles: u64,
}

/// Scans library roots into the index.
///
/// The scanner owns no global state: the filesystem, the index and the
/// [`Dispatch`] that receives its logs are all handed to it. A scan runs
/// sequentially (roots, then titles, then chapters, each in directory order)
/// and checks for cancellation before every root and every title.
#[derive(Clone)]
pub struct Scanner {
    fs: FsHandle,
    store: StoreHandle,
    dispatch: Dispatch,
    policy: TitleFailurePolicy,
}

/// A title's chapter folders, in scan order.
struct TitleDir {
    record: TitleRecord,
    chapters: Vec<DirEntry>,
}

impl Scanner {
    pub fn new(fs: FsHandle, store: StoreHandle, dispatch: Dispatch) -> Self {
        Self { fs, store, dispatch, policy: TitleFailurePolicy::default() }
    }

    pub fn with_policy(mut self, policy: TitleFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TitleFailurePolicy {
        self.policy
    }

    /// Scan every root and reconcile what is found into the index.
    ///
    /// Fails with [`Cancelled`](LibraryErrorKind::Cancelled) if `cancel` fires
    /// (titles committed before that point stay committed), or with
    /// [`Scan`](LibraryErrorKind::Scan) if a title could not be written under
    /// [`TitleFailurePolicy::Abort`].
    pub async fn scan(&self, roots: &[PathBuf], cancel: &CancellationToken) -> LibraryResult<ScanStats> {
        let span = tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::info_span!("library_scan", fs = self.fs.name(), roots = roots.len())
        });
        let result = self.scan_inner(roots, cancel).instrument(span).with_subscriber(self.dispatch.clone()).await;
        result.map_err(|err| {
            let kind = if err.is_cancelled() { LibraryErrorKind::Cancelled } else { LibraryErrorKind::Scan };
            err.raise(kind)
        })
    }

    /// Run [`scan()`](Self::scan) as a background task.
    ///
    /// Failures are logged before being returned through the handle;
    /// cancellation is not a failure and is only logged at `info`.
    pub fn spawn(&self, roots: Vec<PathBuf>, cancel: CancellationToken) -> JoinHandle<LibraryResult<ScanStats>> {
        let scanner = self.clone();
        tokio::spawn(async move {
            let result = scanner.scan(&roots, &cancel).await;
            tracing::dispatcher::with_default(&scanner.dispatch, || match &result {
                Err(err) if err.is_cancelled() => tracing::info!("Library scan cancelled"),
                Err(err) => tracing::error!(error = ?err, "Library scan failed"),
                Ok(_) => {},
            });
            result
        })
    }

    async fn scan_inner(&self, roots: &[PathBuf], cancel: &CancellationToken) -> Result<ScanStats> {
        let started = std::time::Instant::now();
        tracing::info!("Library scan started");
        let mut stats = ScanStats::default();

        for root in roots {
            if cancel.is_cancelled() {
                exn::bail!(ErrorKind::Cancelled);
            }
            let root = normalize_path(root);
            let titles = match self.list_directories(&root).await {
                Ok(titles) => titles,
                Err(err) => {
                    tracing::warn!(root = %root.display(), error = ?err, "Unable to read library root; skipping");
                    stats.skipped_roots += 1;
                    continue;
                },
            };
            stats.roots += 1;

            for title in titles {
                if cancel.is_cancelled() {
                    exn::bail!(ErrorKind::Cancelled);
                }
                match self.scan_title(&title, &mut stats).await {
                    Ok(()) => {},
                    Err(err) if self.policy == TitleFailurePolicy::Skip && !err.is_cancelled() => {
                        tracing::warn!(title = %title.path.display(), error = ?err, "Unable to index title; skipping");
                        stats.failed_titles += 1;
                    },
                    Err(err) => return Err(err),
                }
            }
        }

        tracing::info!(
            roots = stats.roots,
            titles = stats.titles,
            chapters = stats.chapters,
            pages = stats.pages,
            skipped_chapters = stats.skipped_chapters,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Library scan complete",
        );
        Ok(stats)
    }

    /// Subdirectories of `path`, in scan order. Directories whose path is not
    /// valid UTF-8 cannot be stored in the index and are left out.
    async fn list_directories(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = self.fs.list_dir(path).await.or_raise(|| ErrorKind::Filesystem)?;
        entries.retain(|entry| {
            if entry.is_dir && entry.path.to_str().is_none() {
                tracing::warn!(path = %entry.path.display(), "Directory path is not valid UTF-8; skipping");
                return false;
            }
            entry.is_dir
        });
        entries.sort_by(|a, b| directory_cmp(&a.name(), &b.name()));
        Ok(entries)
    }

    #[instrument(skip_all, fields(title = %entry.path.display()))]
    async fn scan_title(&self, entry: &DirEntry, stats: &mut ScanStats) -> Result<()> {
        let path = normalize_path(&entry.path);
        let chapters = match self.list_directories(&path).await {
            Ok(chapters) => chapters,
            Err(err) => {
                tracing::warn!(error = ?err, "Unable to read title directory; skipping");
                stats.skipped_titles += 1;
                return Ok(());
            },
        };
        if chapters.is_empty() {
            tracing::debug!("Title has no chapter directories; skipping");
            return Ok(());
        }
        let name = entry.name();
        let record = TitleRecord {
            id: stable_id(EntityKind::Title, &path),
            sort_name: name.to_lowercase(),
            name,
            path,
        };
        let title = TitleDir { record, chapters };

        let mut uow = self.store.begin().await.or_raise(|| ErrorKind::Index)?;
        let written = match self.write_title(uow.as_mut(), &title, stats).await {
            Ok(written) => written,
            Err(err) => {
                if let Err(rollback) = uow.rollback().await {
                    tracing::warn!(error = ?rollback, "Unable to roll back title");
                }
                return Err(err);
            },
        };
        match written {
            Some(rollup) => {
                uow.commit().await.or_raise(|| ErrorKind::Index)?;
                stats.titles += 1;
                stats.chapters += u64::from(rollup.chapter_count);
                stats.pages += rollup.page_count;
                tracing::debug!(chapters = rollup.chapter_count, pages = rollup.page_count, "Title indexed");
            },
            None => {
                uow.rollback().await.or_raise(|| ErrorKind::Index)?;
                tracing::debug!("Title has no chapters with pages; skipping");
            },
        }
        Ok(())
    }

    /// Write a title and its chapters through `uow`, returning the rollup
    /// that was written, or `None` if no chapter had any pages.
    async fn write_title(
        &self,
        uow: &mut dyn UnitOfWork,
        title: &TitleDir,
        stats: &mut ScanStats,
    ) -> Result<Option<TitleRollup>> {
        uow.upsert_title(&title.record).await.or_raise(|| ErrorKind::Index)?;
        let mut rollup = TitleRollup {
            title_id: title.record.id.clone(),
            chapter_count: 0,
            page_count: 0,
            last_content_at: None,
        };
        for entry in &title.chapters {
            let chapter = match collect_chapter(self.fs.as_ref(), &entry.path).await {
                Ok(chapter) => chapter,
                Err(err) => {
                    tracing::warn!(chapter = %entry.path.display(), error = ?err, "Unable to process chapter; skipping");
                    stats.skipped_chapters += 1;
                    continue;
                },
            };
            if chapter.pages.is_empty() {
                continue;
            }
            self.write_chapter(uow, &title.record.id, &chapter).await?;
            rollup.chapter_count += 1;
            rollup.page_count += u64::from(chapter.page_count());
            rollup.last_content_at = latest(rollup.last_content_at, chapter.modified_at);
        }
        if rollup.chapter_count == 0 {
            return Ok(None);
        }
        uow.finalize_title(&rollup).await.or_raise(|| ErrorKind::Index)?;
        Ok(Some(rollup))
    }

    async fn write_chapter(&self, uow: &mut dyn UnitOfWork, title_id: &str, chapter: &CollectedChapter) -> Result<()> {
        uow.upsert_chapter(&chapter.to_chapter(title_id)).await.or_raise(|| ErrorKind::Index)?;
        for page in &chapter.pages {
            uow.upsert_page(page).await.or_raise(|| ErrorKind::Index)?;
        }
        Ok(())
    }
}

fn latest(current: Option<UtcDateTime>, candidate: UtcDateTime) -> Option<UtcDateTime> {
    Some(current.map_or(candidate, |current| current.max(candidate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shelf_index::models::{Chapter, LibraryStats, Page};
    use shelf_index::{Database, Repository, Store};
    use shelf_storage::backend::{LocalFilesystem, MockFilesystem};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scanner(fs: impl shelf_storage::Filesystem + 'static, repo: &Repository) -> Scanner {
        Scanner::new(Arc::new(fs), Arc::new(repo.clone()), Dispatch::none())
    }

    fn roots(paths: &[&str]) -> Vec<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    /// Delegates to a real repository but fails the Nth chapter upsert.
    struct FailingStore {
        inner: Repository,
        fail_on_chapter: usize,
        chapters: Arc<AtomicUsize>,
    }

    struct FailingUnitOfWork {
        inner: Box<dyn UnitOfWork>,
        fail_on_chapter: usize,
        chapters: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Store for FailingStore {
        async fn begin(&self) -> shelf_index::error::Result<Box<dyn UnitOfWork>> {
            Ok(Box::new(FailingUnitOfWork {
                inner: self.inner.begin().await?,
                fail_on_chapter: self.fail_on_chapter,
                chapters: Arc::clone(&self.chapters),
            }))
        }
    }

    #[async_trait]
    impl UnitOfWork for FailingUnitOfWork {
        async fn upsert_title(&mut self, title: &TitleRecord) -> shelf_index::error::Result<()> {
            self.inner.upsert_title(title).await
        }

        async fn upsert_chapter(&mut self, chapter: &Chapter) -> shelf_index::error::Result<()> {
            if self.chapters.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on_chapter {
                exn::bail!(shelf_index::error::ErrorKind::Database);
            }
            self.inner.upsert_chapter(chapter).await
        }

        async fn upsert_page(&mut self, page: &Page) -> shelf_index::error::Result<()> {
            self.inner.upsert_page(page).await
        }

        async fn finalize_title(&mut self, rollup: &TitleRollup) -> shelf_index::error::Result<()> {
            self.inner.finalize_title(rollup).await
        }

        async fn commit(self: Box<Self>) -> shelf_index::error::Result<()> {
            self.inner.commit().await
        }

        async fn rollback(self: Box<Self>) -> shelf_index::error::Result<()> {
            self.inner.rollback().await
        }
    }

    /// Delegates to a real repository and cancels the scan as soon as the
    /// first title is committed.
    struct CancellingStore {
        inner: Repository,
        cancel: CancellationToken,
        begins: Arc<AtomicUsize>,
    }

    struct CancellingUnitOfWork {
        inner: Box<dyn UnitOfWork>,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl Store for CancellingStore {
        async fn begin(&self) -> shelf_index::error::Result<Box<dyn UnitOfWork>> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CancellingUnitOfWork { inner: self.inner.begin().await?, cancel: self.cancel.clone() }))
        }
    }

    #[async_trait]
    impl UnitOfWork for CancellingUnitOfWork {
        async fn upsert_title(&mut self, title: &TitleRecord) -> shelf_index::error::Result<()> {
            self.inner.upsert_title(title).await
        }

        async fn upsert_chapter(&mut self, chapter: &Chapter) -> shelf_index::error::Result<()> {
            self.inner.upsert_chapter(chapter).await
        }

        async fn upsert_page(&mut self, page: &Page) -> shelf_index::error::Result<()> {
            self.inner.upsert_page(page).await
        }

        async fn finalize_title(&mut self, rollup: &TitleRollup) -> shelf_index::error::Result<()> {
            self.inner.finalize_title(rollup).await
        }

        async fn commit(self: Box<Self>) -> shelf_index::error::Result<()> {
            self.inner.commit().await?;
            self.cancel.cancel();
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> shelf_index::error::Result<()> {
            self.inner.rollback().await
        }
    }

    fn library() -> MockFilesystem {
        MockFilesystem::with_files([
            ("/lib/Akira/Ch01/01.jpg", b"x".to_vec()),
            ("/lib/Akira/Ch01/02.jpg", b"x".to_vec()),
            ("/lib/Akira/Ch02/01.jpg", b"x".to_vec()),
            ("/lib/Berserk/Ch01/01.jpg", b"x".to_vec()),
            ("/lib/Claymore/Ch01/01.jpg", b"x".to_vec()),
        ])
    }

    #[tokio::test]
    async fn test_end_to_end_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("library");
        for (file, data) in [
            ("MangaA/Ch01/1.jpg", b"one".as_slice()),
            ("MangaA/Ch01/2.jpg", b"two".as_slice()),
            ("MangaA/Ch02/1.png", b"three".as_slice()),
        ] {
            let path = root.join(file);
            tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
            tokio::fs::write(&path, data).await.unwrap();
        }
        tokio::fs::create_dir_all(root.join("MangaB")).await.unwrap();
        tokio::fs::write(root.join("stray.txt"), b"not a title").await.unwrap();

        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let stats = scanner(LocalFilesystem::new("local"), &repo)
            .scan(&[root.clone()], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!((stats.titles, stats.chapters, stats.pages), (1, 2, 3));
        assert_eq!(repo.stats().await.unwrap(), LibraryStats { titles: 1, chapters: 2, pages: 3 });

        let title = repo.get_title_by_path(normalize_path(root.join("MangaA"))).await.unwrap().unwrap();
        assert_eq!(title.id, stable_id(EntityKind::Title, root.join("MangaA")));
        assert_eq!((title.name.as_str(), title.sort_name.as_str()), ("MangaA", "mangaa"));
        assert_eq!((title.chapter_count, title.page_count), (2, 3));
        assert!(title.scanned_at.is_some());
        assert!(repo.get_title_by_path(normalize_path(root.join("MangaB"))).await.unwrap().is_none());

        let chapters = repo.list_chapters(&title.id).await.unwrap();
        let numbers: Vec<Option<f64>> = chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![Some(1.0), Some(2.0)]);
        let first: Vec<u32> = repo.list_pages(&chapters[0].id).await.unwrap().iter().map(|p| p.index).collect();
        assert_eq!(first, vec![0, 1]);
        let second = repo.list_pages(&chapters[1].id).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!((second[0].index, second[0].mime.as_str()), (0, "image/png"));
        db.close().await;
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("library");
        let odd = |name: &[u8]| OsStr::from_bytes(name).to_os_string();
        let files = [
            root.join("Akira/Ch01/1.jpg"),
            root.join("Akira/Ch01").join(odd(b"\xff2.jpg")),
            root.join("Akira").join(odd(b"Ch\xfe02")).join("1.jpg"),
            root.join("Berserk/Ch01/1.jpg"),
            root.join(odd(b"\xffBroken")).join("Ch01/1.jpg"),
            root.join("Claymore/Ch01/1.jpg"),
        ];
        for path in &files {
            tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
            tokio::fs::write(path, b"data").await.unwrap();
        }

        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let stats = scanner(LocalFilesystem::new("local"), &repo)
            .scan(&[root.clone()], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!((stats.titles, stats.chapters, stats.pages), (3, 3, 3));
        assert_eq!(repo.stats().await.unwrap(), LibraryStats { titles: 3, chapters: 3, pages: 3 });
        let akira = repo.get_title_by_path(normalize_path(root.join("Akira"))).await.unwrap().unwrap();
        assert_eq!((akira.chapter_count, akira.page_count), (1, 1));
        db.close().await;
    }

    #[tokio::test]
    async fn test_skip_rules() {
        let fs = MockFilesystem::with_files([
            ("/lib/Akira/Ch01/01.jpg", b"x".to_vec()),
            ("/lib/Akira/Empty Chapter/notes.txt", b"x".to_vec()),
            ("/lib/Loose Files/01.jpg", b"x".to_vec()),
            ("/lib/Text Only/Ch01/info.txt", b"x".to_vec()),
            ("/lib/readme.txt", b"x".to_vec()),
        ])
        .with_dir("/lib/Empty Title");
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let stats = scanner(fs, &repo).scan(&roots(&["/lib"]), &CancellationToken::new()).await.unwrap();
        assert_eq!((stats.titles, stats.chapters, stats.pages), (1, 1, 1));
        assert_eq!(repo.stats().await.unwrap(), LibraryStats { titles: 1, chapters: 1, pages: 1 });
        let title = repo.get_title_by_path("/lib/Akira").await.unwrap().unwrap();
        assert_eq!(title.chapter_count, 1);
        for skipped in ["/lib/Loose Files", "/lib/Text Only", "/lib/Empty Title"] {
            assert!(repo.get_title_by_path(skipped).await.unwrap().is_none(), "{skipped} should not be indexed");
        }
        db.close().await;
    }

    #[tokio::test]
    async fn test_rescan_is_stable() {
        let fs = Arc::new(library());
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let scanner = Scanner::new(fs.clone(), Arc::new(repo.clone()), Dispatch::none());
        let cancel = CancellationToken::new();

        let first = scanner.scan(&roots(&["/lib"]), &cancel).await.unwrap();
        let title = repo.get_title_by_path("/lib/Akira").await.unwrap().unwrap();
        let chapters = repo.list_chapters(&title.id).await.unwrap();
        let pages = repo.list_pages(&chapters[0].id).await.unwrap();

        let second = scanner.scan(&roots(&["/lib"]), &cancel).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.stats().await.unwrap(), LibraryStats { titles: 3, chapters: 4, pages: 5 });
        let rescanned = repo.get_title_by_path("/lib/Akira").await.unwrap().unwrap();
        assert_eq!(rescanned.id, title.id);
        assert_eq!(repo.list_chapters(&title.id).await.unwrap(), chapters);
        assert_eq!(repo.list_pages(&chapters[0].id).await.unwrap(), pages);
        db.close().await;
    }

    #[tokio::test]
    async fn test_rescan_picks_up_new_pages() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let cancel = CancellationToken::new();
        let before = MockFilesystem::with_files([
            ("/lib/Akira/Ch01/1.jpg", b"x".to_vec()),
            ("/lib/Akira/Ch01/3.jpg", b"x".to_vec()),
        ]);
        scanner(before, &repo).scan(&roots(&["/lib"]), &cancel).await.unwrap();
        let after = MockFilesystem::with_files([
            ("/lib/Akira/Ch01/1.jpg", b"x".to_vec()),
            ("/lib/Akira/Ch01/2.jpg", b"x".to_vec()),
            ("/lib/Akira/Ch01/3.jpg", b"x".to_vec()),
        ]);
        scanner(after, &repo).scan(&roots(&["/lib"]), &cancel).await.unwrap();

        let chapter_id = stable_id(EntityKind::Chapter, "/lib/Akira/Ch01");
        let pages: Vec<(u32, PathBuf)> =
            repo.list_pages(&chapter_id).await.unwrap().into_iter().map(|p| (p.index, p.path)).collect();
        assert_eq!(pages, vec![
            (0, PathBuf::from("/lib/Akira/Ch01/1.jpg")),
            (1, PathBuf::from("/lib/Akira/Ch01/2.jpg")),
            (2, PathBuf::from("/lib/Akira/Ch01/3.jpg")),
        ]);
        let title = repo.get_title_by_path("/lib/Akira").await.unwrap().unwrap();
        assert_eq!(title.page_count, 3);
        db.close().await;
    }

    #[tokio::test]
    async fn test_rescan_keeps_pages_of_unreadable_chapter() {
        let fs = Arc::new(library());
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let scanner = Scanner::new(fs.clone(), Arc::new(repo.clone()), Dispatch::none());
        let cancel = CancellationToken::new();
        scanner.scan(&roots(&["/lib"]), &cancel).await.unwrap();

        fs.fail("/lib/Akira/Ch02").await;
        let stats = scanner.scan(&roots(&["/lib"]), &cancel).await.unwrap();
        assert_eq!((stats.titles, stats.skipped_chapters), (3, 1));
        let chapter_id = stable_id(EntityKind::Chapter, "/lib/Akira/Ch02");
        assert_eq!(repo.list_pages(&chapter_id).await.unwrap().len(), 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_failed_title_is_rolled_back_and_scan_aborts() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        // Akira's second chapter is the second chapter upserted overall.
        let store = FailingStore { inner: repo.clone(), fail_on_chapter: 2, chapters: Arc::default() };
        let scanner = Scanner::new(Arc::new(library()), Arc::new(store), Dispatch::none());
        let err = scanner.scan(&roots(&["/lib"]), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(&*err, LibraryErrorKind::Scan));
        assert!(!err.is_cancelled());
        assert_eq!(repo.stats().await.unwrap(), LibraryStats::default());
        db.close().await;
    }

    #[tokio::test]
    async fn test_failed_title_is_skipped_under_skip_policy() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let store = FailingStore { inner: repo.clone(), fail_on_chapter: 2, chapters: Arc::default() };
        let scanner = Scanner::new(Arc::new(library()), Arc::new(store), Dispatch::none())
            .with_policy(TitleFailurePolicy::Skip);
        let stats = scanner.scan(&roots(&["/lib"]), &CancellationToken::new()).await.unwrap();
        assert_eq!((stats.titles, stats.failed_titles), (2, 1));
        assert!(repo.get_title_by_path("/lib/Akira").await.unwrap().is_none());
        assert!(repo.get_title_by_path("/lib/Berserk").await.unwrap().is_some());
        assert!(repo.get_title_by_path("/lib/Claymore").await.unwrap().is_some());
        db.close().await;
    }

    #[tokio::test]
    async fn test_cancelled_scan() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = scanner(library(), &repo).scan(&roots(&["/lib"]), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(matches!(&*err, LibraryErrorKind::Cancelled));
        assert_eq!(repo.stats().await.unwrap(), LibraryStats::default());
        db.close().await;
    }

    #[tokio::test]
    async fn test_cancelled_between_titles_keeps_committed_titles() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let cancel = CancellationToken::new();
        let begins = Arc::new(AtomicUsize::new(0));
        let store = CancellingStore { inner: repo.clone(), cancel: cancel.clone(), begins: Arc::clone(&begins) };
        let scanner = Scanner::new(Arc::new(library()), Arc::new(store), Dispatch::none())
            .with_policy(TitleFailurePolicy::Skip);
        assert_eq!(scanner.policy(), TitleFailurePolicy::Skip);

        let err = scanner.scan(&roots(&["/lib"]), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(matches!(&*err, LibraryErrorKind::Cancelled));
        assert_eq!(begins.load(Ordering::SeqCst), 1);
        assert_eq!(repo.stats().await.unwrap(), LibraryStats { titles: 1, chapters: 2, pages: 3 });
        assert!(repo.get_title_by_path("/lib/Akira").await.unwrap().is_some());
        assert!(repo.get_title_by_path("/lib/Berserk").await.unwrap().is_none());
        db.close().await;
    }

    #[tokio::test]
    async fn test_unreadable_root_title_and_chapter_are_skipped() {
        let fs = MockFilesystem::with_files([
            ("/broken/Akira/Ch01/01.jpg", b"x".to_vec()),
            ("/lib/Akira/Ch01/01.jpg", b"x".to_vec()),
            ("/lib/Akira/Ch02/01.jpg", b"x".to_vec()),
            ("/lib/Berserk/Ch01/01.jpg", b"x".to_vec()),
        ])
        .with_failure("/broken")
        .with_failure("/lib/Akira/Ch02")
        .with_failure("/lib/Berserk");
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let stats = scanner(fs, &repo)
            .scan(&roots(&["/broken", "/missing", "/lib"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stats.skipped_roots, 2);
        assert_eq!(stats.skipped_titles, 1);
        assert_eq!(stats.skipped_chapters, 1);
        assert_eq!(repo.stats().await.unwrap(), LibraryStats { titles: 1, chapters: 1, pages: 1 });
        db.close().await;
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::new(db.pool().clone(), true);
        let stats = scanner(library(), &repo).scan(&roots(&["/lib"]), &CancellationToken::new()).await.unwrap();
        assert_eq!(stats.titles, 3);
        assert_eq!(repo.stats().await.unwrap(), LibraryStats::default());
        db.close().await;
    }

    #[tokio::test]
    async fn test_spawn() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let handle = scanner(library(), &repo).spawn(roots(&["/lib"]), CancellationToken::new());
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.pages, 5);
        db.close().await;
    }

    #[test]
    fn test_latest() {
        let early = UtcDateTime::from_unix_timestamp(100).unwrap();
        let late = UtcDateTime::from_unix_timestamp(200).unwrap();
        assert_eq!(latest(None, early), Some(early));
        assert_eq!(latest(Some(late), early), Some(late));
        assert_eq!(latest(Some(early), late), Some(late));
    }
}
