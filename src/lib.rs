//! ticket-engine - Ticket lifecycle and transactional consistency engine
//!
//! Systems own categories, categories own tickets, and every ticket carries
//! an append-only audit log. Users are granted per-category memberships that
//! gate ticket assignment.
//!
//! All operations go through [`Tracker`]:
//! - ticket lifecycle: create (or append to the open ticket), change, assign,
//!   unassign and close
//! - relationships: systems, categories, user accounts and memberships
//! - queries: filtered, paged listings and ticket details
//!
//! Writes run inside explicitly passed [`storage::Transaction`] handles.
//! An operation that needs another one's effect (closing a ticket writes its
//! closing log entry through the create operation) hands its handle down, so
//! the nested call joins the open transaction instead of starting its own.

// Allow missing error documentation for internal implementations
#![allow(clippy::missing_errors_doc)]
// Allow some pedantic lints that don't improve code quality
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::map_unwrap_or)]

//! # Example
//!
//! ```rust,no_run
//! use ticket_engine::core::CreateTicketBuilder;
//! use ticket_engine::storage::Database;
//! use ticket_engine::Tracker;
//!
//! # async fn demo() -> ticket_engine::Result<()> {
//! let tracker = Tracker::new(Database::in_memory().await?);
//! tracker.add_system("Main").await?;
//! tracker.add_category("Main", "Network").await?;
//!
//! let report = CreateTicketBuilder::new()
//!     .category("Network")
//!     .reference("router-7")
//!     .summary("Packet loss on uplink")
//!     .title("Router 7 degraded")
//!     .build();
//! let created = tracker.create_ticket(report).await?;
//! tracker.close_ticket(created.ticket_id, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod tracker;

#[cfg(test)]
pub mod test_utils;

pub use error::{Result, TrackerError};
pub use tracker::Tracker;
