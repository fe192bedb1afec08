//! Table definitions
//!
//! References are declared for documentation only; the connection runs with
//! foreign key enforcement off because deletes are shallow and dependents
//! keep their ids.

use sqlx::SqlitePool;

use crate::error::Result;

const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS systems (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        system_id INTEGER NOT NULL REFERENCES systems(id),
        UNIQUE (name, system_id)
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('Admin', 'User'))
    )",
    "CREATE TABLE IF NOT EXISTS tickets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER NOT NULL REFERENCES categories(id),
        reference TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('Open', 'Closed')),
        title TEXT NOT NULL,
        time TEXT NOT NULL,
        user_id INTEGER REFERENCES users(id),
        system_id INTEGER NOT NULL REFERENCES systems(id)
    )",
    // At most one open ticket per (reference, system)
    "CREATE UNIQUE INDEX IF NOT EXISTS tickets_open_reference
        ON tickets (reference, system_id) WHERE status = 'Open'",
    "CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ticket_id INTEGER NOT NULL REFERENCES tickets(id),
        summary TEXT NOT NULL,
        details TEXT NOT NULL,
        time TEXT NOT NULL,
        user_id INTEGER REFERENCES users(id)
    )",
    "CREATE INDEX IF NOT EXISTS logs_ticket ON logs (ticket_id)",
    "CREATE TABLE IF NOT EXISTS memberships (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        category_id INTEGER NOT NULL REFERENCES categories(id),
        UNIQUE (user_id, category_id)
    )",
];

/// Create every table and index that does not exist yet
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::debug!(statements = STATEMENTS.len(), "Schema applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        apply(&pool).await.unwrap();
        apply(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(
            tables,
            vec!["categories", "logs", "memberships", "systems", "tickets", "users"]
        );
    }

    #[tokio::test]
    async fn test_open_reference_index_allows_closed_duplicates() {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        apply(&pool).await.unwrap();

        let insert = "INSERT INTO tickets (category_id, reference, status, title, time, system_id)
                      VALUES (1, 'r1', ?, 't', '2024-01-01T00:00:00Z', 1)";
        sqlx::query(insert).bind("Closed").execute(&pool).await.unwrap();
        sqlx::query(insert).bind("Closed").execute(&pool).await.unwrap();
        sqlx::query(insert).bind("Open").execute(&pool).await.unwrap();
        assert!(sqlx::query(insert).bind("Open").execute(&pool).await.is_err());
    }
}
