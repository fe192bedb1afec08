use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::schema;
use super::transaction::{IsolationLevel, Transaction};
use crate::config::DatabaseSettings;
use crate::error::Result;

/// Handle on the relational store
///
/// Cloning is cheap; every clone shares the same pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the store described by `settings` and make sure the schema exists
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let in_memory = settings.is_in_memory();
        if let Some(parent) = settings.file_path().as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut options = SqliteConnectOptions::from_str(&settings.url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(settings.busy_timeout_ms))
            .foreign_keys(false);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms));
        pool_options = if in_memory {
            // An in-memory database lives exactly as long as its connection
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(settings.max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        schema::apply(&pool).await?;
        info!(url = %settings.url, in_memory, "Database ready");
        Ok(Self { pool })
    }

    /// Private in-memory store, mostly for tests
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseSettings::in_memory()).await
    }

    /// Pool for reads that run outside a transaction
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a new transaction; the returned handle owns it
    pub async fn begin(&self, level: IsolationLevel) -> Result<Transaction<'static>> {
        let conn = self.pool.acquire().await?;
        Transaction::begin(conn, level).await
    }

    /// Reuse `ambient` when a transaction is already active, otherwise open
    /// one at `level`
    ///
    /// Only an opener commits or rolls back; a joined handle leaves both to
    /// the owner.
    pub async fn enter<'t>(
        &self,
        ambient: Option<&'t mut Transaction<'_>>,
        level: IsolationLevel,
    ) -> Result<Transaction<'t>> {
        match ambient {
            Some(outer) => Ok(outer.join()),
            None => self.begin(level).await,
        }
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
