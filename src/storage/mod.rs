//! Relational storage: connection pool, schema, transactions and row access

mod database;
pub mod repository;
mod schema;
mod transaction;

pub use database::Database;
pub use transaction::{IsolationLevel, Transaction};
