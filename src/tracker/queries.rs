//! Read-only ticket listing
//!
//! Reads run on a pooled connection and never open a transaction; they see
//! whatever was committed when the statement ran.

use super::Tracker;
use crate::core::{TicketDetails, TicketFilter, TicketQuery, TicketRow};
use crate::error::Result;
use crate::storage::repository;

impl Tracker {
    /// Filtered, id-ordered page of tickets
    pub async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<TicketRow>> {
        let mut conn = self.db.pool().acquire().await?;
        repository::list_ticket_rows(&mut conn, query).await
    }

    /// Every ticket, ordered by id
    pub async fn list_all_tickets(&self) -> Result<Vec<TicketRow>> {
        self.list_tickets(&TicketQuery::default()).await
    }

    /// Number of tickets matching `filter`, ignoring paging
    pub async fn count_tickets(&self, filter: &TicketFilter) -> Result<u64> {
        let mut conn = self.db.pool().acquire().await?;
        repository::count_ticket_rows(&mut conn, filter).await
    }

    /// Header and log of a ticket, or `None` when no ticket has that id
    pub async fn ticket_details(&self, id: i64) -> Result<Option<TicketDetails>> {
        let mut conn = self.db.pool().acquire().await?;
        let Some(header) = repository::ticket_row_by_id(&mut conn, id).await? else {
            return Ok(None);
        };
        let logs = repository::logs_of_ticket(&mut conn, id).await?;
        Ok(Some(TicketDetails { header, logs }))
    }
}
