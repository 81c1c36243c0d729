//! # Dashboard Errors
//!
//! The error taxonomy shared by every network-facing component of the engine.
//! Transport failures and malformed payloads are kept apart so the logs can
//! tell a dead API from a schema drift.

use thiserror::Error;

/// Errors raised while talking to the collaborator API.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The request never produced a response (DNS, connect, timeout, TLS...).
    #[error("transport failure on {endpoint}: {message}")]
    Transport {
        /// Relative API path of the failed request.
        endpoint: String,
        /// Rendered cause reported by the HTTP stack.
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        /// Relative API path of the failed request.
        endpoint: String,
        /// Numeric HTTP status code.
        status: u16,
        /// Error body returned by the server, possibly empty.
        body: String,
    },

    /// The payload did not match the expected shape.
    #[error("malformed response from {endpoint}: {source}")]
    MalformedResponse {
        /// Relative API path whose body failed to decode.
        endpoint: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A configured base URL or path could not be turned into a request URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl DashboardError {
    /// True for the transport class of failures (network or HTTP status).
    pub fn is_transport(&self) -> bool {
        matches!(self, DashboardError::Transport { .. } | DashboardError::Status { .. })
    }

    /// Endpoint the error is attributed to, when there is one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            DashboardError::Transport { endpoint, .. }
            | DashboardError::Status { endpoint, .. }
            | DashboardError::MalformedResponse { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }
}

/// Convenience alias used across the crate.
pub type DashboardResult<T> = Result<T, DashboardError>;
