//! Console error types
//!
//! Every remote call made by the console resolves to one of three kinds of
//! failure. None of them is fatal to a page: reads degrade into an empty list
//! with an error banner, mutations into a transient notification.

use thiserror::Error;

/// Failure classes surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request rejected, timed out, or never reached the server
    Network,
    /// Server payload did not have the expected shape
    Validation,
    /// Server rejected a mutation
    Action,
}

/// Console error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsoleError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Validation(String),

    #[error("{target}: {message}")]
    Action { target: String, message: String },
}

impl ConsoleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::Http { .. } => ErrorKind::Network,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Action { .. } => ErrorKind::Action,
        }
    }

    /// Re-label a failure of a mutation against `target`.
    ///
    /// Transport and status failures of a mutation are reported as the
    /// action failing, naming the record it was applied to.
    pub fn into_action(self, target: &str) -> Self {
        match self {
            Self::Action { .. } => self,
            Self::Http { status, body } if body.is_empty() => Self::Action {
                target: target.to_string(),
                message: format!("HTTP {}", status),
            },
            Self::Http { body, .. } => Self::Action {
                target: target.to_string(),
                message: body,
            },
            Self::Network(message) | Self::Validation(message) => Self::Action {
                target: target.to_string(),
                message,
            },
        }
    }

    /// Short message suitable for a banner or notification
    pub fn message(&self) -> String {
        match self {
            Self::Action { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
