//! Layered configuration.
//!
//! Later layers win:
//! 1. built-in defaults,
//! 2. `config.toml` in the user's configuration directory,
//! 3. `partpush.{toml,yaml,yml,json}` (found from the working directory
//!    upwards), or a single file passed explicitly,
//! 4. `PARTPUSH_*` environment variables, nested keys split on `__`
//!    (`PARTPUSH_BACKOFF__MAX_SECS=60`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "PARTPUSH_";
const PROJECT_FILE_STEM: &str = "partpush";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bytes per chunk.
    pub chunk_size: u64,
    /// Progress ledger, relative to the working directory.
    pub ledger: PathBuf,
    /// Ignore-rules file kept up to date in push modes.
    pub ignore_file: PathBuf,
    /// Patterns added to the ignore file on top of the computed ones.
    pub ignore_patterns: Vec<String>,
    pub remote: String,
    pub branch: String,
    /// Git executable; looked up on `PATH` when unset.
    pub git: Option<PathBuf>,
    pub backoff: BackoffConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: 10 * 1024 * 1024,
            ledger: PathBuf::from(".partpush-ledger"),
            ignore_file: PathBuf::from(".gitignore"),
            ignore_patterns: Vec::new(),
            remote: "origin".to_string(),
            branch: "main".to_string(),
            git: None,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Push retry delays, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_secs: u64,
    pub step_secs: u64,
    pub max_secs: u64,
}
impl Default for BackoffConfig {
    fn default() -> Self {
        Self { initial_secs: 10, step_secs: 5, max_secs: 300 }
    }
}
impl BackoffConfig {
    pub fn initial(&self) -> Duration {
        Duration::from_secs(self.initial_secs)
    }

    pub fn step(&self) -> Duration {
        Duration::from_secs(self.step_secs)
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }
}

impl Config {
    /// Merge every layer and validate the result.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit
            && !path.is_file()
        {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let config: Self = Self::figment(explicit).extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// The layered provider [`load`](Self::load) extracts from.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dirs) = ProjectDirs::from("", "", PROJECT_FILE_STEM) {
            figment = figment.merge(Toml::file(dirs.config_dir().join("config.toml")));
        }
        figment = match explicit {
            Some(path) => merge_by_extension(figment, path),
            None => figment
                .merge(Toml::file(format!("{PROJECT_FILE_STEM}.toml")))
                .merge(Yaml::file(format!("{PROJECT_FILE_STEM}.yaml")))
                .merge(Yaml::file(format!("{PROJECT_FILE_STEM}.yml")))
                .merge(Json::file(format!("{PROJECT_FILE_STEM}.json"))),
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            exn::bail!(ErrorKind::Invalid("chunk_size must be greater than zero".to_string()));
        }
        if self.backoff.initial_secs > self.backoff.max_secs {
            exn::bail!(ErrorKind::Invalid(format!(
                "backoff.initial_secs ({}) is greater than backoff.max_secs ({})",
                self.backoff.initial_secs, self.backoff.max_secs
            )));
        }
        if self.remote.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("remote must not be empty".to_string()));
        }
        if self.branch.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("branch must not be empty".to_string()));
        }
        if self.ledger.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("ledger path must not be empty".to_string()));
        }
        Ok(())
    }
}

fn merge_by_extension(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}
