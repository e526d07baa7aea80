// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Herald notification service.

use std::fmt;

use thiserror::Error;

/// The primary error type used across all Herald adapters, handlers, and
/// ingress operations.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed payload or missing required field.
    #[error("validation error: {0}")]
    Validation(String),

    /// Entity missing for the current tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Uniqueness or optimistic version violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The transport behind a route could not be reached.
    #[error("transport unreachable: {message}")]
    TransportUnreachable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The transport asked us to slow down.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The transport rejected the payload and will keep rejecting it.
    #[error("permanent transport failure: {0}")]
    PermanentTransport(String),

    /// Publish targeted a route id with no bound publisher.
    #[error("unknown route reference: {0}")]
    UnknownRoute(String),

    /// A notification referenced a route id that does not exist.
    #[error("no route found with id {0}")]
    NoRoute(String),

    /// No candidate route matched the requested mode, type, and partition.
    #[error("no routes matched {0}")]
    NoRouteMatched(String),

    /// Template text failed to parse or render.
    #[error("template error: {0}")]
    Template(String),

    /// Outbound notification without a message or template.
    #[error("notification has neither a message nor a template")]
    MissingTemplate,

    /// Rendering produced no content for the transport.
    #[error("rendering produced no content")]
    EmptyRendering,

    /// Missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Worker pool saturated.
    #[error("service overloaded: {0}")]
    Overloaded(String),

    /// The surrounding context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Transport-neutral classification of a [`HeraldError`], used by the
/// gateway to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    Aborted,
    FailedPrecondition,
    Unavailable,
    DeadlineExceeded,
    ResourceExhausted,
    Unauthenticated,
    Cancelled,
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Aborted => "aborted",
            ErrorCode::FailedPrecondition => "failed_precondition",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::DeadlineExceeded => "deadline_exceeded",
            ErrorCode::ResourceExhausted => "resource_exhausted",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl HeraldError {
    /// Shorthand for [`HeraldError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        HeraldError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a [`HeraldError::TransportUnreachable`] without a source.
    pub fn unreachable(message: impl Into<String>) -> Self {
        HeraldError::TransportUnreachable {
            message: message.into(),
            source: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HeraldError::NotFound { .. })
    }

    /// Whether the event bus should redeliver after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HeraldError::Conflict(_)
                | HeraldError::Storage { .. }
                | HeraldError::TransportUnreachable { .. }
                | HeraldError::Timeout { .. }
                | HeraldError::RateLimited(_)
                | HeraldError::Overloaded(_)
                | HeraldError::Cancelled
                | HeraldError::Internal(_)
        )
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            HeraldError::Validation(_)
            | HeraldError::MissingTemplate
            | HeraldError::Template(_)
            | HeraldError::Config(_) => ErrorCode::InvalidArgument,
            HeraldError::NotFound { .. } | HeraldError::NoRoute(_) => ErrorCode::NotFound,
            HeraldError::Conflict(_) => ErrorCode::Aborted,
            HeraldError::NoRouteMatched(_)
            | HeraldError::EmptyRendering
            | HeraldError::PermanentTransport(_)
            | HeraldError::UnknownRoute(_) => ErrorCode::FailedPrecondition,
            HeraldError::TransportUnreachable { .. } | HeraldError::Storage { .. } => {
                ErrorCode::Unavailable
            }
            HeraldError::Timeout { .. } => ErrorCode::DeadlineExceeded,
            HeraldError::RateLimited(_) | HeraldError::Overloaded(_) => {
                ErrorCode::ResourceExhausted
            }
            HeraldError::Unauthorized(_) => ErrorCode::Unauthenticated,
            HeraldError::Cancelled => ErrorCode::Cancelled,
            HeraldError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<serde_json::Error> for HeraldError {
    fn from(e: serde_json::Error) -> Self {
        HeraldError::Validation(format!("invalid JSON: {e}"))
    }
}
