//! Client error taxonomy.
//!
//! Every failure the core reports to a front-end is a [`ClientError`]. None of
//! them are fatal: callers show the message as a transient notice and the user
//! decides whether to try again.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientErrorKind {
    /// Required input missing; raised before any network call
    Validation,
    /// Server response could not be parsed
    Protocol,
    /// Credentials or registration rejected by the server
    Auth,
    /// Transport failure (connect, timeout, TLS)
    Network,
    /// Remote delete failed after the entry was already removed locally
    DeleteCommit,
    /// Non-2xx response from a data endpoint
    HttpStatus,
    /// Local session storage could not be written or cleared
    Storage,
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientErrorKind::Validation => write!(f, "validation"),
            ClientErrorKind::Protocol => write!(f, "protocol"),
            ClientErrorKind::Auth => write!(f, "auth"),
            ClientErrorKind::Network => write!(f, "network"),
            ClientErrorKind::DeleteCommit => write!(f, "delete_commit"),
            ClientErrorKind::HttpStatus => write!(f, "http_status"),
            ClientErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Structured error with kind and a one-line message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientError {
    /// Error category
    pub kind: ClientErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw response body)
    pub details: Option<String>,
}

impl ClientError {
    /// Creates a new client error.
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches details to the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        self.details = (!details.is_empty()).then_some(details);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Validation, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Protocol, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Auth, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Storage, message)
    }

    /// Creates a network error from a transport failure.
    pub fn network(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else if err.is_connect() {
            "Could not connect to server".to_string()
        } else {
            "Request failed".to_string()
        };
        Self::new(ClientErrorKind::Network, message).with_details(err.to_string())
    }

    /// Creates an HTTP status error.
    ///
    /// The backend reports failures as `{"error": "..."}`; when present that
    /// string becomes part of the message.
    pub fn http_status(status: u16, body: &str) -> Self {
        let server_message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| json.get("error").and_then(Value::as_str).map(str::to_string));
        let message = match server_message {
            Some(msg) => format!("HTTP {status}: {msg}"),
            None => format!("HTTP {status}"),
        };
        Self::new(ClientErrorKind::HttpStatus, message).with_details(body)
    }

    /// Converts this error into a delete-commit notice for `entry_id`.
    #[must_use]
    pub fn into_delete_commit(self, entry_id: i64) -> Self {
        Self {
            kind: ClientErrorKind::DeleteCommit,
            message: format!("Failed to delete entry {entry_id} from server"),
            details: Some(self.message),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ClientError {}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
