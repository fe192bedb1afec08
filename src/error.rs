//! Error types for the ticket engine
//!
//! Every operation returns [`Result`]; the variants mirror the failure kinds
//! a caller can observe, so a boundary layer can turn any of them into a
//! plain success/failure message without inspecting store internals.

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors produced by the ticket engine
#[derive(Debug, Error)]
pub enum TrackerError {
    /// One or more required request fields were blank or absent
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Input was present but malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A ticket id was required but not supplied
    #[error("Ticket id not specified")]
    IdNotSpecified,

    #[error("System '{0}' not found")]
    SystemNotFound(String),

    #[error("Category '{name}' not found{}", system_suffix(.system.as_deref()))]
    CategoryNotFound { name: String, system: Option<String> },

    /// A category name without a system matched more than one category
    #[error("Category '{name}' exists in {count} systems; specify the system")]
    AmbiguousCategory { name: String, count: usize },

    #[error("User '{0}' not found")]
    UserNotFound(String),

    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("User '{user}' is not assigned to category '{category}'")]
    MembershipNotFound { user: String, category: String },

    /// Insert-if-absent found the key already present
    #[error("{entity} '{key}' already exists (id {id})")]
    AlreadyExists {
        entity: &'static str,
        key: String,
        id: i64,
    },

    /// Rename target is already taken
    #[error("{entity} '{name}' already exists")]
    NameConflict { entity: &'static str, name: String },

    /// Another open ticket already uses this reference in the same system
    #[error("An open ticket with reference '{reference}' already exists (id {id})")]
    ReferenceConflict { reference: String, id: i64 },

    #[error("User '{user}' is not a member of category '{category}'")]
    NotCategoryMember { user: String, category: String },

    #[error("Username '{username}' or email '{email}' is already taken")]
    UsernameOrEmailTaken { username: String, email: String },

    /// Unexpected store failure (connectivity, unanticipated constraint)
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

fn system_suffix(system: Option<&str>) -> String {
    system.map(|s| format!(" in system '{s}'")).unwrap_or_default()
}

impl TrackerError {
    /// Create a custom error with a message
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Whether the error reports a missing row rather than a conflict or fault
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SystemNotFound(_)
                | Self::CategoryNotFound { .. }
                | Self::UserNotFound(_)
                | Self::TicketNotFound(_)
                | Self::MembershipNotFound { .. }
        )
    }

    /// Whether the error was raised before any store interaction
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingFields(_) | Self::InvalidInput(_) | Self::IdNotSpecified
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_lists_every_name() {
        let err = TrackerError::MissingFields(vec!["category", "title"]);
        assert_eq!(err.to_string(), "Missing required fields: category, title");
        assert!(err.is_validation());
    }

    #[test]
    fn test_category_not_found_message() {
        let err = TrackerError::CategoryNotFound {
            name: "Network".to_string(),
            system: Some("Prod".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Category 'Network' not found in system 'Prod'"
        );

        let err = TrackerError::CategoryNotFound {
            name: "Network".to_string(),
            system: None,
        };
        assert_eq!(err.to_string(), "Category 'Network' not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_already_exists_echoes_id() {
        let err = TrackerError::AlreadyExists {
            entity: "System",
            key: "Prod".to_string(),
            id: 7,
        };
        assert_eq!(err.to_string(), "System 'Prod' already exists (id 7)");
        assert!(!err.is_not_found());
    }
}
