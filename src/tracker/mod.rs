//! The ticket engine
//!
//! [`Tracker`] is the single entry point for every operation: ticket
//! lifecycle (`lifecycle`), systems/categories/memberships (`relations`),
//! user accounts (`accounts`) and read-only listing (`queries`).
//!
//! Write operations follow the same shape: validate input before touching
//! the store, open (or join) a transaction at the isolation the operation
//! needs, re-check existence through unique keys inside it, write, then let
//! [`crate::storage::Transaction::finish`] commit or roll back.

mod accounts;
mod lifecycle;
mod queries;
mod relations;

use sqlx::SqliteConnection;

use crate::config::Settings;
use crate::core::{Category, User};
use crate::error::{Result, TrackerError};
use crate::storage::{Database, repository};

/// Ticket-tracking engine over a relational store
#[derive(Clone, Debug)]
pub struct Tracker {
    db: Database,
}

impl Tracker {
    /// Wrap an already connected database
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Connect using `settings`
    pub async fn open(settings: &Settings) -> Result<Self> {
        Ok(Self::new(Database::connect(&settings.database).await?))
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }
}

/// Trimmed value of a required field, or `MissingFields` naming it
fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(TrackerError::MissingFields(vec![field]))
    } else {
        Ok(trimmed)
    }
}

/// Resolve a category by name, within `system` when given
///
/// Without a system the name must be unique across all systems.
async fn resolve_category(
    conn: &mut SqliteConnection,
    name: &str,
    system: Option<&str>,
) -> Result<Category> {
    let not_found = || TrackerError::CategoryNotFound {
        name: name.to_string(),
        system: system.map(str::to_string),
    };

    if let Some(system_name) = system {
        let Some(system) = repository::find_system(conn, system_name).await? else {
            return Err(not_found());
        };
        return repository::find_category(conn, name, system.id)
            .await?
            .ok_or_else(not_found);
    }

    let mut candidates = repository::categories_named(conn, name).await?;
    match candidates.len() {
        0 => Err(not_found()),
        1 => Ok(candidates.remove(0)),
        count => Err(TrackerError::AmbiguousCategory {
            name: name.to_string(),
            count,
        }),
    }
}

async fn resolve_user(conn: &mut SqliteConnection, username: &str) -> Result<User> {
    repository::find_user(conn, username)
        .await?
        .ok_or_else(|| TrackerError::UserNotFound(username.to_string()))
}
