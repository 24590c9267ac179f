//! Opening the index database.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// One scan writing, a few readers listing.
const POOL_SIZE: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the index database.
///
/// Opening a database always brings its schema up to date; the applied
/// versions are tracked by sqlx in `_sqlx_migrations`.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    location: Option<PathBuf>,
}

impl Database {
    /// Open (creating if necessary) the index database file at `path`.
    #[instrument(name = "open_index", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = Self::options().filename(path).create_if_missing(true);
        Self::open(options, POOL_SIZE, Some(path.to_path_buf())).await
    }

    /// Open a private in-memory database.
    ///
    /// Every connection to `:memory:` gets its own empty database, so the pool
    /// is limited to one connection. Not test-only: other crates build their
    /// test fixtures on it.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::open(Self::options().filename(":memory:"), 1, None).await
    }

    async fn open(options: SqliteConnectOptions, size: u32, location: Option<PathBuf>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(size)
            // Runs for every pooled connection, not only the first.
            .after_connect(|conn, _meta| Box::pin(async move { Self::tune(conn).await }))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool, location };
        db.migrate().await?;
        Ok(db)
    }

    fn options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Readers see the state before or after a title transaction,
            // never the middle of one.
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
    }

    /// Per-connection settings that `SqliteConnectOptions` has no setter for.
    async fn tune(conn: &mut SqliteConnection) -> sqlx::Result<()> {
        sqlx::query("PRAGMA wal_autocheckpoint = 800; PRAGMA cache_size = -8192; PRAGMA temp_store = MEMORY;")
            .execute(conn)
            .await?;
        Ok(())
    }

    #[instrument("migrating index schema", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Latest applied schema version.
    pub async fn schema_version(&self) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success = TRUE")
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// File the database lives in, or `None` for an in-memory database.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked-out connections to come back, then close the pool.
    pub async fn close(&self) {
        // Refresh query planner statistics while we still can.
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}
