//! Result and error types for salon-probar.
//!
//! Absence (`NotFound`, `SlotNotFound`) and exhaustion (`RetryExhausted`)
//! are their own variants so a test can assert on them without matching
//! message text, and so a transport failure can never be mistaken for
//! "no matching row".

use thiserror::Error;

/// Result type for salon-probar operations
pub type SalonResult<T> = Result<T, SalonError>;

/// Maximum number of response-body characters kept in an error
pub const MAX_ERROR_BODY_CHARS: usize = 2000;

/// Errors that can occur while searching, polling or mutating
#[derive(Debug, Error)]
pub enum SalonError {
    /// Network failure while talking to the gateway
    #[error("{operation}: transport failure: {message}")]
    Transport {
        /// Operation name (GraphQL operation or REST endpoint)
        operation: String,
        /// Error message
        message: String,
    },

    /// Gateway answered with a non-success status
    #[error("{operation}: HTTP {status}: {body}")]
    Http {
        /// Operation name
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// GraphQL response carried an `errors` array
    #[error("{operation}: GraphQL errors: {}", messages.join("; "))]
    GraphQl {
        /// Operation name
        operation: String,
        /// Error messages reported by the server
        messages: Vec<String>,
    },

    /// Response did not have the expected shape
    #[error("{operation}: missing or malformed field `{path}`")]
    MissingField {
        /// Operation name
        operation: String,
        /// Field path that was missing
        path: String,
    },

    /// A paginated search scanned every page without a match
    #[error("{search}: no match after scanning {pages_scanned} page(s)")]
    NotFound {
        /// What was searched for
        search: String,
        /// Pages fetched before giving up
        pages_scanned: usize,
    },

    /// A retry-poll spent its whole attempt budget
    #[error("{operation}: gave up after {attempts} attempt(s), last observed: {last_observed}")]
    RetryExhausted {
        /// What was polled
        operation: String,
        /// Attempts performed
        attempts: u32,
        /// Last observed state
        last_observed: String,
    },

    /// An ordered scan checked every candidate without a hit
    #[error("{scan}: nothing found after {checks} check(s)")]
    SlotNotFound {
        /// What was scanned for
        scan: String,
        /// Checks performed
        checks: usize,
    },

    /// UI driver failure (click, visibility check, reload...)
    #[error("Driver {action} failed: {message}")]
    Driver {
        /// Driver action
        action: String,
        /// Error message
        message: String,
    },

    /// Best-effort cleanup finished with failed steps
    #[error("Cleanup failed for {}: {}", failed.join(", "), first_error)]
    Cleanup {
        /// Names of the failed steps
        failed: Vec<String>,
        /// First failure message
        first_error: String,
    },

    /// Invalid configuration or policy
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl SalonError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Create a missing-field error
    #[must_use]
    pub fn missing_field(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::MissingField {
            operation: operation.into(),
            path: path.into(),
        }
    }

    /// Create an HTTP status error, truncating the body
    #[must_use]
    pub fn http(operation: impl Into<String>, status: u16, body: &str) -> Self {
        Self::Http {
            operation: operation.into(),
            status,
            body: truncate_body(body),
        }
    }

    /// True when a full search or scan found nothing
    #[must_use]
    pub const fn is_absence(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::SlotNotFound { .. })
    }

    /// True when a poll spent its whole attempt budget
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::RetryExhausted { .. })
    }

    /// True for network and gateway failures
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http { .. })
    }
}

fn truncate_body(body: &str) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
