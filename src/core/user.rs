use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

/// Role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
    Admin,
    /// Least-privileged role, given to every newly registered user
    #[default]
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::User => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(TrackerError::InvalidInput(format!(
                "Unknown role '{other}'. Expected Admin or User"
            ))),
        }
    }
}

/// A stored user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
}

/// Registration request
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub(crate) fn validate(&self) -> crate::error::Result<()> {
        let missing: Vec<&'static str> = [
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::MissingFields(missing))
        }
    }
}

/// Partial update of a user account; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct UserChange {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserChange {
    /// Drops blank values so they never overwrite stored fields
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            email: non_blank(self.email),
            password: non_blank(self.password),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// One-way, fixed-length (64 hex chars) digest stored in place of a password
#[must_use]
pub fn digest_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}
