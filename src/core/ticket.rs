use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::user::non_blank;
use crate::error::{Result, TrackerError};

/// Ticket lifecycle state
///
/// `Open` is the initial state; `Closed` is terminal for that ticket
/// instance. A later report with the same reference starts a new ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TicketStatus {
    #[default]
    Open,
    Closed,
}

impl TicketStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(TrackerError::InvalidInput(format!(
                "Unknown status '{other}'. Expected Open or Closed"
            ))),
        }
    }
}

/// A stored ticket row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub category_id: i64,
    pub reference: String,
    pub status: TicketStatus,
    pub title: String,
    pub time: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub system_id: i64,
}

/// Append-only audit entry attached to a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub ticket_id: i64,
    pub summary: String,
    pub details: String,
    pub time: DateTime<Utc>,
    pub user_id: Option<i64>,
    /// Author username, when the author still exists
    pub author: Option<String>,
}

/// A report that either opens a ticket or appends to the open one
///
/// Use [`super::CreateTicketBuilder`] to assemble one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTicket {
    pub category: String,
    /// Owning system of `category`; may be omitted when the category name is
    /// unique across systems
    pub system: Option<String>,
    pub reference: String,
    pub summary: String,
    pub title: String,
    pub details: Option<String>,
    /// Username recorded as the log author
    pub creator: Option<String>,
}

/// A [`CreateTicket`] whose required fields are present and whose details
/// have been defaulted
#[derive(Debug, Clone)]
pub(crate) struct Report {
    pub category: String,
    pub system: Option<String>,
    pub reference: String,
    pub summary: String,
    pub title: String,
    pub details: String,
    pub creator: Option<String>,
}

impl CreateTicket {
    pub(crate) fn validate(self) -> Result<Report> {
        let missing: Vec<&'static str> = [
            ("category", &self.category),
            ("reference", &self.reference),
            ("summary", &self.summary),
            ("title", &self.title),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(TrackerError::MissingFields(missing));
        }

        let details = non_blank(self.details).unwrap_or_else(|| self.summary.clone());
        Ok(Report {
            category: self.category,
            system: non_blank(self.system),
            reference: self.reference,
            summary: self.summary,
            title: self.title,
            details,
            creator: non_blank(self.creator),
        })
    }
}

/// What a successful create did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTicket {
    pub ticket_id: i64,
    pub log_id: i64,
    /// `true` when the report was appended to an already open ticket
    pub appended: bool,
}

/// Partial edit of an open ticket; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketChange {
    pub id: Option<i64>,
    /// New category name, resolved inside the ticket's own system
    pub category: Option<String>,
    pub title: Option<String>,
    pub reference: Option<String>,
    pub actor: Option<String>,
}

impl TicketChange {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub(crate) fn validated_id(&self) -> Result<i64> {
        match self.id {
            Some(id) if id >= 0 => Ok(id),
            _ => Err(TrackerError::IdNotSpecified),
        }
    }
}

/// Key addressing a ticket by id or by its open reference within a system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketKey {
    Id(i64),
    Reference { reference: String, system: String },
}

impl TicketKey {
    #[must_use]
    pub fn reference(reference: impl Into<String>, system: impl Into<String>) -> Self {
        Self::Reference {
            reference: reference.into(),
            system: system.into(),
        }
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Reference { reference, system } => write!(f, "{reference} in {system}"),
        }
    }
}

impl From<i64> for TicketKey {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

/// Denormalized ticket listing row
///
/// Category, system and user names are `None` when the referenced row no
/// longer exists (or, for the user, when the ticket is unassigned).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRow {
    pub id: i64,
    pub reference: String,
    pub status: TicketStatus,
    pub title: String,
    pub time: DateTime<Utc>,
    pub category_id: i64,
    pub category: Option<String>,
    pub system_id: i64,
    pub system: Option<String>,
    pub user_id: Option<i64>,
    pub user: Option<String>,
}

/// Ticket header plus its audit log, oldest entry first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetails {
    pub header: TicketRow,
    pub logs: Vec<LogEntry>,
}

/// Restriction on the assigned user
///
/// `Unassigned` is a real filter, distinct from `Any`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UserFilter {
    #[default]
    Any,
    Unassigned,
    User(String),
}

/// Predicates over the ticket listing, combined with AND
///
/// Category, status and system match exactly; reference and title match
/// substrings. Absent fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub category: Option<String>,
    pub reference: Option<String>,
    pub status: Option<TicketStatus>,
    pub title: Option<String>,
    pub system: Option<String>,
    pub user: UserFilter,
}

impl TicketFilter {
    /// Whether a listing row satisfies every predicate
    ///
    /// Mirrors the SQL the query engine generates; used to check results.
    #[must_use]
    pub fn matches(&self, row: &TicketRow) -> bool {
        if let Some(ref category) = self.category {
            if row.category.as_ref() != Some(category) {
                return false;
            }
        }

        if let Some(ref reference) = self.reference {
            if !row.reference.contains(reference.as_str()) {
                return false;
            }
        }

        if let Some(status) = self.status {
            if row.status != status {
                return false;
            }
        }

        if let Some(ref title) = self.title {
            if !row.title.contains(title.as_str()) {
                return false;
            }
        }

        if let Some(ref system) = self.system {
            if row.system.as_ref() != Some(system) {
                return false;
            }
        }

        match &self.user {
            UserFilter::Any => true,
            UserFilter::Unassigned => row.user_id.is_none(),
            UserFilter::User(name) => row.user.as_ref() == Some(name),
        }
    }
}

/// Offset pagination over the id-ordered listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub from: u32,
    /// `None` takes every remaining row
    pub count: Option<u32>,
}

impl Page {
    #[must_use]
    pub const fn new(from: u32, count: u32) -> Self {
        Self {
            from,
            count: Some(count),
        }
    }
}

/// Listing request: filter plus page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketQuery {
    pub filter: TicketFilter,
    pub page: Page,
}
