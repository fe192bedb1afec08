use super::{CreateTicket, Page, TicketFilter, TicketQuery, TicketStatus, UserFilter};

/// Builder for creating [`CreateTicket`] requests
#[derive(Default)]
pub struct CreateTicketBuilder {
    category: Option<String>,
    system: Option<String>,
    reference: Option<String>,
    summary: Option<String>,
    title: Option<String>,
    details: Option<String>,
    creator: Option<String>,
}

impl CreateTicketBuilder {
    /// Create a new request builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the category name
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the system owning the category
    #[must_use]
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the correlation reference
    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Set the log summary
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the ticket title
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the log details (defaults to the summary)
    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the author username
    #[must_use]
    pub fn creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Build the request; missing fields are reported when it is submitted
    pub fn build(self) -> CreateTicket {
        CreateTicket {
            category: self.category.unwrap_or_default(),
            system: self.system,
            reference: self.reference.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            details: self.details,
            creator: self.creator,
        }
    }
}

/// Builder for [`TicketQuery`] listings
///
/// Blank strings are treated as "no constraint".
#[derive(Default)]
pub struct TicketQueryBuilder {
    filter: TicketFilter,
    page: Page,
}

impl TicketQueryBuilder {
    /// Create a new query builder matching every ticket
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact category name
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.filter.category = non_blank(category.into());
        self
    }

    /// Reference substring
    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.filter.reference = non_blank(reference.into());
        self
    }

    /// Exact status
    #[must_use]
    pub const fn status(mut self, status: TicketStatus) -> Self {
        self.filter.status = Some(status);
        self
    }

    /// Title substring
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.filter.title = non_blank(title.into());
        self
    }

    /// Exact system name
    #[must_use]
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.filter.system = non_blank(system.into());
        self
    }

    /// Only tickets assigned to `username`
    #[must_use]
    pub fn user(mut self, username: impl Into<String>) -> Self {
        self.filter.user = UserFilter::User(username.into());
        self
    }

    /// Only tickets with no assignee
    #[must_use]
    pub fn unassigned(mut self) -> Self {
        self.filter.user = UserFilter::Unassigned;
        self
    }

    /// Skip the first `from` rows
    #[must_use]
    pub const fn skip(mut self, from: u32) -> Self {
        self.page.from = from;
        self
    }

    /// Take at most `count` rows
    #[must_use]
    pub const fn take(mut self, count: u32) -> Self {
        self.page.count = Some(count);
        self
    }

    /// Build the query
    pub fn build(self) -> TicketQuery {
        TicketQuery {
            filter: self.filter,
            page: self.page,
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
