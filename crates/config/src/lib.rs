//! Layered configuration.
//!
//! Values are resolved from (lowest to highest priority):
//!
//! 1. Built-in defaults (see [`Config::default()`]).
//! 2. An optional configuration file; TOML, YAML or JSON by extension.
//! 3. Environment variables prefixed with `SHELF_`, using `__` to reach into
//!    sections (`SHELF_SCAN__DRY_RUN=true`, `SHELF_LOG__LEVEL=debug`).
//!
//! ```toml
//! [database]
//! path = "/var/lib/shelf/index.db"
//!
//! [library]
//! roots = ["/srv/manga"]
//!
//! [scan]
//! on_title_error = "abort"
//! dry_run = false
//!
//! [log]
//! level = "info"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SHELF_";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub library: LibraryConfig,
    pub scan: ScanConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Location of the SQLite index. Created if it does not exist.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Folders laid out as `<root>/<title>/<chapter>/<pages>`.
    pub roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub on_title_error: OnTitleError,
    /// Run every write but commit nothing.
    pub dry_run: bool,
}

/// What a scan does when a title cannot be written to the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnTitleError {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level; `RUST_LOG` directives take precedence when set.
    pub level: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = directories::ProjectDirs::from("", "", "shelf")
            .map(|dirs| dirs.data_dir().join("index.db"))
            .unwrap_or_else(|| PathBuf::from("shelf.db"));
        Self { path }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Config {
    /// Build the figment that [`load()`](Self::load) extracts from.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            if !file.is_file() {
                exn::bail!(ErrorKind::Invalid(format!("configuration file {} does not exist", file.display())));
            }
            let extension = file.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file_exact(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
                Some("json") => figment.merge(Json::file_exact(file)),
                _ => exn::bail!(ErrorKind::Invalid(format!(
                    "unsupported configuration format: {} (expected .toml, .yaml or .json)",
                    file.display()
                ))),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the configuration.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(file)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(file = ?file, roots = config.library.roots.len(), "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database.path must not be empty".to_string()));
        }
        if let Some(index) = self.library.roots.iter().position(|root| root.as_os_str().is_empty()) {
            exn::bail!(ErrorKind::Invalid(format!("library.roots[{index}] must not be empty")));
        }
        if !LOG_LEVELS.contains(&self.log.level.to_ascii_lowercase().as_str()) {
            exn::bail!(ErrorKind::Invalid(format!(
                "log.level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.log.level
            )));
        }
        Ok(())
    }
}
