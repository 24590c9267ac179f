//! `shelf` indexes folders of comics and manga into a SQLite library.

mod error;

use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use shelf_config::{Config, OnTitleError};
use shelf_index::{Database, Repository};
use shelf_library::{Scanner, TitleFailurePolicy};
use shelf_storage::backend::LocalFilesystem;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, global = true, env = "SHELF_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan library roots and update the index.
    Scan {
        /// Library root to scan; repeat for several. Replaces the configured roots.
        #[arg(short, long = "root", value_name = "DIR")]
        roots: Vec<PathBuf>,
        /// Perform every write but commit nothing.
        #[arg(long)]
        dry_run: bool,
    },
    /// List indexed titles, most recently updated first.
    Titles {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = shelf_index::DEFAULT_LISTING_LIMIT)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.exit_code() != 130 {
                eprintln!("Error: {err:?}");
            }
            ExitCode::from(err.exit_code())
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let dispatch = dispatch(&config.log.level);
    // Collaborators other than the scanner log through the global default.
    _ = tracing::dispatcher::set_global_default(dispatch.clone());

    if let Some(parent) = config.database.path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Database)?;
    }
    let db = Database::connect(&config.database.path).await.or_raise(|| ErrorKind::Database)?;
    let result = match cli.command {
        Command::Scan { roots, dry_run } => scan(&config, &db, dispatch, roots, dry_run).await,
        Command::Titles { page, limit } => titles(&db, page, limit).await,
    };
    db.close().await;
    result
}

fn dispatch(level: &str) -> Dispatch {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_ascii_lowercase()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).finish();
    Dispatch::new(subscriber)
}

async fn scan(config: &Config, db: &Database, dispatch: Dispatch, roots: Vec<PathBuf>, dry_run: bool) -> Result<()> {
    let roots = if roots.is_empty() { config.library.roots.clone() } else { roots };
    if roots.is_empty() {
        exn::bail!(ErrorKind::NoRoots);
    }
    let policy = match config.scan.on_title_error {
        OnTitleError::Abort => TitleFailurePolicy::Abort,
        OnTitleError::Skip => TitleFailurePolicy::Skip,
    };
    let repo = Repository::new(db.pool().clone(), dry_run || config.scan.dry_run);
    let dry_run = repo.is_dry_run();
    let scanner = Scanner::new(Arc::new(LocalFilesystem::new("local")), Arc::new(repo), dispatch).with_policy(policy);

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; stopping before the next title");
                cancel.cancel();
            }
        }
    });
    let result = scanner.scan(&roots, &cancel).await;
    interrupt.abort();

    let stats = match result {
        Ok(stats) => stats,
        Err(err) if err.is_cancelled() => {
            tracing::info!("Scan cancelled");
            return Err(err.raise(ErrorKind::Cancelled));
        },
        Err(err) => return Err(err.raise(ErrorKind::Scan)),
    };
    let suffix = if dry_run { " (dry run, nothing committed)" } else { "" };
    println!(
        "Indexed {} titles, {} chapters, {} pages{suffix}",
        stats.titles, stats.chapters, stats.pages
    );
    let skipped = stats.skipped_roots + stats.skipped_titles + stats.skipped_chapters + stats.failed_titles;
    if skipped > 0 {
        println!(
            "Skipped {} roots, {} titles and {} chapters that could not be read; {} titles failed",
            stats.skipped_roots, stats.skipped_titles, stats.skipped_chapters, stats.failed_titles
        );
    }
    Ok(())
}

async fn titles(db: &Database, page: u32, limit: u32) -> Result<()> {
    let repo = Repository::from(db);
    let listing = repo.list_titles(page, limit).await.or_raise(|| ErrorKind::Query)?;
    for title in &listing.items {
        println!(
            "{}\t{} chapters\t{} pages\t{}",
            title.name,
            title.chapter_count,
            title.page_count,
            title.path.display()
        );
    }
    println!(
        "Page {} ({} per page) of {} titles{}",
        listing.page,
        listing.limit,
        listing.total,
        if listing.has_more { "; more available" } else { "" }
    );
    Ok(())
}
