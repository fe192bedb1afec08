//! Layered configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional config
//! file, `TICKET_ENGINE_*` environment variables (`__` separates nested
//! keys, e.g. `TICKET_ENGINE_DATABASE__URL`), then explicit overrides.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

const ENV_PREFIX: &str = "TICKET_ENGINE";

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
}

/// Relational store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// sqlx connection URL, e.g. `sqlite://tickets.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
    /// How long a writer waits for a competing lock before failing
    pub busy_timeout_ms: u64,
    /// How long an operation waits for a pooled connection
    pub acquire_timeout_ms: u64,
}

impl DatabaseSettings {
    /// Settings for a private in-memory store
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }

    /// Settings for a file-backed store at `path`
    #[must_use]
    pub fn file(path: &Path) -> Self {
        Self {
            url: format!("sqlite://{}", path.display()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Filesystem path of a file-backed store
    #[must_use]
    pub fn file_path(&self) -> Option<PathBuf> {
        if self.is_in_memory() {
            return None;
        }
        let rest = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or(rest);
        (!path.is_empty()).then(|| PathBuf::from(path))
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
            acquire_timeout_ms: 30_000,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file, the environment and an
    /// optional database URL override
    pub fn load(file: Option<&Path>, database_url: Option<&str>) -> Result<Self> {
        let defaults = DatabaseSettings::default();
        let mut builder = Config::builder()
            .set_default("database.url", defaults.url)?
            .set_default("database.max_connections", i64::from(defaults.max_connections))?
            .set_default("database.busy_timeout_ms", clamp_i64(defaults.busy_timeout_ms))?
            .set_default(
                "database.acquire_timeout_ms",
                clamp_i64(defaults.acquire_timeout_ms),
            )?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("database.url", database_url.map(str::to_string))?
            .build()?
            .try_deserialize::<Self>()?;

        tracing::debug!(url = %settings.database.url, "Loaded settings");
        Ok(settings)
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// `sqlite://<data dir>/tickets.db`, falling back to the working directory
fn default_database_url() -> String {
    ProjectDirs::from("", "", "ticket-engine").map_or_else(
        || "sqlite://tickets.db".to_string(),
        |dirs| format!("sqlite://{}", dirs.data_dir().join("tickets.db").display()),
    )
}
