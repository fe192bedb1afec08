//! Shared fixtures for integration tests

#![allow(dead_code)]

use tempfile::TempDir;
use ticket_engine::Tracker;
use ticket_engine::config::DatabaseSettings;
use ticket_engine::core::{CreateTicket, CreateTicketBuilder};
use ticket_engine::storage::Database;

pub const SYSTEM: &str = "Main";
pub const CATEGORY: &str = "Test";

/// Tracker over a private in-memory store with `Main/Test` seeded
pub async fn seeded_tracker() -> Tracker {
    let tracker = Tracker::new(Database::in_memory().await.unwrap());
    seed(&tracker).await;
    tracker
}

/// Tracker over a file-backed store in `dir`, with `Main/Test` seeded
///
/// File stores allow several pooled connections, which the concurrency
/// tests need.
pub async fn file_tracker(dir: &TempDir) -> Tracker {
    let mut settings = DatabaseSettings::file(&dir.path().join("tickets.db"));
    settings.max_connections = 8;
    let tracker = Tracker::new(Database::connect(&settings).await.unwrap());
    seed(&tracker).await;
    tracker
}

async fn seed(tracker: &Tracker) {
    tracker.add_system(SYSTEM).await.unwrap();
    tracker.add_category(SYSTEM, CATEGORY).await.unwrap();
}

/// Report for `reference` in the seeded category
pub fn report(reference: &str, summary: &str) -> CreateTicket {
    CreateTicketBuilder::new()
        .category(CATEGORY)
        .system(SYSTEM)
        .reference(reference)
        .summary(summary)
        .title(format!("Title {reference}"))
        .build()
}

/// Row counts of every table, for before/after comparisons
pub async fn table_counts(tracker: &Tracker) -> Vec<(String, i64)> {
    let mut counts = Vec::new();
    for table in ["systems", "categories", "users", "tickets", "logs", "memberships"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(tracker.database().pool())
            .await
            .unwrap();
        counts.push((table.to_string(), count));
    }
    counts
}
