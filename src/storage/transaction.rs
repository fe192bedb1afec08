//! Transaction coordination
//!
//! A [`Transaction`] is an explicit handle passed down the call chain. The
//! handle that issued `BEGIN` owns the transaction; a handle obtained through
//! [`Transaction::join`] borrows the owner's connection and never begins,
//! commits or rolls back. This is what lets one operation call another
//! (close → create, for instance) inside a single unit of work.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};
use std::fmt;
use tracing::{debug, warn};

use crate::error::Result;

/// Isolation requested for a unit of work
///
/// SQLite runs every transaction serializably with a single writer. Both
/// levels take the write lock at `BEGIN`, so concurrent units queue on the
/// busy timeout instead of failing when a WAL snapshot goes stale between
/// the read and the first write. The level records what the caller relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Read existing rows, then mutate them
    RepeatableRead,
    /// Insert-if-absent; no second caller can pass the absence check
    Serializable,
}

impl IsolationLevel {
    /// Every unit of work writes, so both levels begin as writers
    pub(crate) const fn begin_statement(self) -> &'static str {
        match self {
            Self::RepeatableRead | Self::Serializable => "BEGIN IMMEDIATE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepeatableRead => f.write_str("repeatable read"),
            Self::Serializable => f.write_str("serializable"),
        }
    }
}

enum Handle<'a> {
    Owned(PoolConnection<Sqlite>),
    Joined(&'a mut SqliteConnection),
}

/// Handle on an open transaction
pub struct Transaction<'a> {
    handle: Handle<'a>,
    level: IsolationLevel,
    finished: bool,
}

impl Transaction<'static> {
    /// Begin a transaction on `conn`; the returned handle owns it
    pub(crate) async fn begin(
        mut conn: PoolConnection<Sqlite>,
        level: IsolationLevel,
    ) -> Result<Self> {
        sqlx::query(level.begin_statement())
            .execute(&mut *conn)
            .await?;
        debug!(%level, "Transaction opened");
        Ok(Self {
            handle: Handle::Owned(conn),
            level,
            finished: false,
        })
    }
}

impl Transaction<'_> {
    /// Whether this handle opened the transaction and may end it
    #[must_use]
    pub const fn is_owner(&self) -> bool {
        matches!(self.handle, Handle::Owned(_))
    }

    /// Isolation the owner opened the transaction with
    #[must_use]
    pub const fn level(&self) -> IsolationLevel {
        self.level
    }

    /// Connection to run statements on
    pub fn conn(&mut self) -> &mut SqliteConnection {
        match &mut self.handle {
            Handle::Owned(conn) => &mut **conn,
            Handle::Joined(conn) => &mut **conn,
        }
    }

    /// Non-owning handle on the same transaction
    pub fn join(&mut self) -> Transaction<'_> {
        let level = self.level;
        debug!(%level, "Joining ambient transaction");
        Transaction {
            handle: Handle::Joined(self.conn()),
            level,
            finished: false,
        }
    }

    /// Commit if owner; no-op for a joined handle
    ///
    /// A failed `COMMIT` is followed by a rollback so the connection never
    /// returns to the pool mid-transaction.
    pub async fn commit(mut self) -> Result<()> {
        self.finished = true;
        let Handle::Owned(conn) = &mut self.handle else {
            return Ok(());
        };

        match sqlx::query("COMMIT").execute(&mut **conn).await {
            Ok(_) => {
                debug!(level = %self.level, "Transaction committed");
                Ok(())
            },
            Err(e) => {
                warn!(error = %e, "Commit failed, rolling back");
                if sqlx::query("ROLLBACK").execute(&mut **conn).await.is_err() {
                    conn.close_on_drop();
                }
                Err(e.into())
            },
        }
    }

    /// Roll back if owner; no-op for a joined handle
    pub async fn rollback(mut self) {
        self.finished = true;
        let Handle::Owned(conn) = &mut self.handle else {
            return;
        };

        match sqlx::query("ROLLBACK").execute(&mut **conn).await {
            Ok(_) => debug!(level = %self.level, "Transaction rolled back"),
            Err(e) => {
                warn!(error = %e, "Rollback failed, discarding connection");
                conn.close_on_drop();
            },
        }
    }

    /// End a unit of work: commit on `Ok`, roll back on `Err`
    ///
    /// Joined handles pass the result through untouched so the owner decides.
    pub async fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            },
            Err(e) => {
                if self.is_owner() {
                    debug!(error = %e, "Unit of work failed");
                }
                self.rollback().await;
                Err(e)
            },
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Handle::Owned(conn) = &mut self.handle {
            // Cannot roll back without awaiting; closing the connection
            // discards the open transaction instead.
            warn!(level = %self.level, "Owned transaction dropped unfinished");
            conn.close_on_drop();
        }
    }
}
