//! Layered configuration for labelsync.
//!
//! Values are merged from, lowest to highest precedence:
//! 1. built-in defaults,
//! 2. a configuration file (YAML, TOML or JSON, chosen by extension),
//! 3. environment variables prefixed `LABELSYNC_`, with nested keys separated
//!    by a double underscore (`LABELSYNC_SYNC__BATCH_SIZE=100`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use labelsync_engine::options::{
    DEFAULT_BATCH_SIZE, DEFAULT_DESTINATION_PREFIX, DEFAULT_SOURCE_PREFIX, DEFAULT_TASK_PAGE_SIZE,
};
use labelsync_engine::{PathRewrite, ReconcileOptions};
use labelsync_remote::models::ItemStatus;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "LABELSYNC_";
const DATABASE_FILENAME: &str = "mappings.sqlite";
const CONFIG_FILENAME: &str = "config.yaml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "labelsync")
}

/// Where the configuration file is looked for when none is given.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub paths: PathsConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the mappings.
    pub path: PathBuf,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = match project_dirs() {
            Some(dirs) => dirs.data_dir().join(DATABASE_FILENAME),
            None => PathBuf::from(DATABASE_FILENAME),
        };
        Self { path }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub batch_size: u64,
    pub task_page_size: u64,
    pub eligible_status: String,
}
impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            task_page_size: DEFAULT_TASK_PAGE_SIZE,
            eligible_status: ItemStatus::Completed.to_string(),
        }
    }
}

/// Prefix substitution applied to storage locators before they are handed
/// to the annotation service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub source_prefix: String,
    pub destination_prefix: String,
}
impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_prefix: DEFAULT_SOURCE_PREFIX.to_string(),
            destination_prefix: DEFAULT_DESTINATION_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Load and validate the configuration.
    ///
    /// An explicit `file` must exist. Without one, the default location is
    /// used if a file is there, and skipped otherwise.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::FileNotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_config_file().filter(|path| path.is_file()),
        };
        let config: Self = Self::figment(file.as_deref())?.extract().or_raise(|| ErrorKind::Extract)?;
        config.validate()?;
        tracing::debug!(file = ?file, database = %config.database.path.display(), "Loaded configuration");
        Ok(config)
    }

    /// The layered figment behind [`load()`](Self::load), for callers that
    /// want to merge in providers of their own.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            let extension = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
            figment = match extension.as_deref() {
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync.batch_size == 0 {
            exn::bail!(ErrorKind::InvalidValue("sync.batch_size"));
        }
        if self.sync.task_page_size == 0 {
            exn::bail!(ErrorKind::InvalidValue("sync.task_page_size"));
        }
        if self.sync.eligible_status.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidValue("sync.eligible_status"));
        }
        Ok(())
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            batch_size: self.sync.batch_size,
            task_page_size: self.sync.task_page_size,
            eligible_status: match self.sync.eligible_status.parse::<ItemStatus>() {
                Ok(status) => status,
                Err(never) => match never {},
            },
            path_rewrite: PathRewrite::new(&self.paths.source_prefix, &self.paths.destination_prefix),
        }
    }
}
