//! Test utilities for ticket-engine
//!
//! Fixtures that hand out a [`Tracker`] over a private in-memory database,
//! optionally pre-seeded with one system and one category.

#![cfg(test)]

use crate::core::{CreateTicketBuilder, CreatedTicket};
use crate::storage::Database;
use crate::tracker::Tracker;

/// System created by [`TestTracker::seeded`]
pub const SYSTEM: &str = "Main";
/// Category created by [`TestTracker::seeded`] inside [`SYSTEM`]
pub const CATEGORY: &str = "Test";

/// Tracker backed by an in-memory database
pub struct TestTracker {
    pub tracker: Tracker,
}

impl TestTracker {
    /// Empty store
    pub async fn new() -> Self {
        let db = Database::in_memory()
            .await
            .expect("Failed to open in-memory database");
        Self {
            tracker: Tracker::new(db),
        }
    }

    /// Store holding system `Main` with category `Test`
    pub async fn seeded() -> Self {
        let fixture = Self::new().await;
        fixture
            .tracker
            .add_system(SYSTEM)
            .await
            .expect("Failed to add system");
        fixture
            .tracker
            .add_category(SYSTEM, CATEGORY)
            .await
            .expect("Failed to add category");
        fixture
    }

    /// Report `summary` under `reference` in the seeded category
    ///
    /// The title is `Title <reference>`.
    pub async fn report(&self, reference: &str, summary: &str) -> CreatedTicket {
        let request = CreateTicketBuilder::new()
            .category(CATEGORY)
            .system(SYSTEM)
            .reference(reference)
            .summary(summary)
            .title(format!("Title {reference}"))
            .build();
        self.tracker
            .create_ticket(request)
            .await
            .expect("Failed to create ticket")
    }
}
