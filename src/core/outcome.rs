//! Transport-neutral result objects
//!
//! The routing layer never sees a [`TrackerError`]; it sees an [`Outcome`]:
//! a success flag, a human-readable message and an optional payload.

use serde::Serialize;

use crate::error::{Result, TrackerError};

/// OK/NOK result handed to whatever sits in front of the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            ok: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(error: &TrackerError) -> Self {
        Self {
            ok: false,
            message: error.to_string(),
            data: None,
        }
    }

    /// Build from an operation result, using `message` on success
    pub fn from_result(result: Result<T>, message: impl FnOnce(&T) -> String) -> Self {
        match result {
            Ok(data) => {
                let text = message(&data);
                Self::success(text, data)
            },
            Err(e) => Self::failure(&e),
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        Self::from_result(result, |_| "OK".to_string())
    }
}
