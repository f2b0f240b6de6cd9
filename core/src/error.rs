//! Error types for the medical-records API client.
//!
//! # Design
//! `Unauthorized` and `NotFound` get dedicated variants because callers
//! routinely branch on them; every other non-2xx response lands in `Http`
//! with the raw status and body. A timeout is its own variant for the message
//! but shares the `Network` category, so callers that only care about
//! "no HTTP response was obtained" can match on `category()`.

use std::time::Duration;

use thiserror::Error;

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No HTTP response was obtained (connect failure, reset, timeout).
    Network,
    /// The backend answered 401; the session has already been cleared.
    Unauthorized,
    /// 4xx other than 401, or a request rejected before it was sent.
    Client,
    /// 5xx.
    Server,
    /// A payload could not be encoded or decoded as JSON.
    Decode,
    /// The client itself is misconfigured.
    Config,
}

/// Errors returned by `ApiClient` and the domain services.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend returned 401. The session was cleared before this error
    /// reached the caller.
    #[error("unauthorized: {body}")]
    Unauthorized { body: String },

    #[error("resource not found: {body}")]
    NotFound { body: String },

    /// Any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A resource id that cannot stand as a single path segment.
    #[error("invalid resource id: {0:?}")]
    InvalidId(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Map a non-2xx status and its body to the matching variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => ApiError::Unauthorized { body },
            404 => ApiError::NotFound { body },
            _ => ApiError::Http { status, body },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => ErrorCategory::Network,
            ApiError::Unauthorized { .. } => ErrorCategory::Unauthorized,
            ApiError::NotFound { .. } => ErrorCategory::Client,
            ApiError::Http { status, .. } if *status >= 500 => ErrorCategory::Server,
            ApiError::Http { .. } | ApiError::InvalidId(_) => ErrorCategory::Client,
            ApiError::Serialization(_) | ApiError::Deserialization(_) => ErrorCategory::Decode,
            ApiError::Config(_) => ErrorCategory::Config,
        }
    }

    /// HTTP status carried by the error, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body carried by the error, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { body }
            | ApiError::NotFound { body }
            | ApiError::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}
