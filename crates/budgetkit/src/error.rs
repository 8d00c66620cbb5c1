//! Error types for budget service operations.
//!
//! Errors are categorized so callers can tell a network problem from a
//! malformed response or a request the service refused.

use std::fmt;

use crate::types::Operation;

/// Result type alias for budget service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, DNS or I/O failure while talking to the service.
    Network,
    /// The service answered with a body that is not the expected JSON.
    Format,
    /// The service answered with an unexpected HTTP status.
    Rejected,
    /// The caller cancelled the operation.
    Cancelled,
    /// Client or resource configuration is invalid.
    Config,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Format => "Malformed service response",
            Self::Rejected => "Request rejected by the service",
            Self::Cancelled => "Operation cancelled",
            Self::Config => "Invalid configuration",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check that the budget service host is reachable and try again",
            Self::Format => "Check that the host points at a budget service API",
            Self::Rejected => "Check the status and response body for the reason",
            Self::Cancelled => "Re-run the operation to continue",
            Self::Config => "Check the host URL, API key and resource fields",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the budget service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced an HTTP response.
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        /// URL that was being called.
        endpoint: String,
        /// Underlying transport error message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        /// URL whose response failed to decode.
        endpoint: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The service answered with a status other than the expected one.
    #[error("failed to {operation}, status: {status}{}", body_suffix(.body))]
    RemoteRejected {
        /// Operation that was rejected.
        operation: Operation,
        /// HTTP status code returned.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The caller cancelled the operation before it completed.
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that was cancelled.
        operation: Operation,
    },

    /// Client configuration or resource input is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn body_suffix(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(", body: {}", body)
    }
}

impl Error {
    /// Create a rejection error.
    pub fn rejected(operation: Operation, status: u16, body: impl Into<String>) -> Self {
        Self::RemoteRejected {
            operation,
            status,
            body: body.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Transport { .. } => ErrorCategory::Network,
            Error::Decode { .. } => ErrorCategory::Format,
            Error::RemoteRejected { .. } => ErrorCategory::Rejected,
            Error::Cancelled { .. } => ErrorCategory::Cancelled,
            Error::InvalidConfig(_) => ErrorCategory::Config,
        }
    }

    /// HTTP status of a rejection, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RemoteRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the service reported the record as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the operation was cancelled by the caller.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}
