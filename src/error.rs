//! Error types for the offer gateway

use thiserror::Error;

/// Errors surfaced at the service boundary (handlers map these to status codes)
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request failed validation; no upstream was contacted
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    /// Detail lookup produced nothing from the primary upstream
    #[error("Not Found")]
    NotFound,

    /// Anything unexpected (serialization, stopped worker pool)
    #[error("Internal Error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}

/// Outcome of a single upstream task that did not produce a value.
///
/// These never leave the aggregation engine; they are logged, counted and
/// dropped from the aggregate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Network, HTTP or decode failure from the upstream
    #[error("upstream {provider} failed: {message}")]
    Upstream { provider: String, message: String },

    /// The upstream call exceeded its configured timeout
    #[error("upstream {0} timed out")]
    Timeout(String),

    /// The upstream answered but had no matching item
    #[error("upstream {0} returned no item")]
    NotFound(String),

    /// The task panicked while running
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The result conduit closed without a value
    #[error("task result dropped")]
    Dropped,
}

/// Errors from the worker pool itself
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is stopped")]
    Stopped,
}

impl From<PoolError> for GatewayError {
    fn from(err: PoolError) -> Self {
        GatewayError::Internal(err.to_string())
    }
}
