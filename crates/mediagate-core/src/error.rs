//! Error types module
//!
//! `AppError` is the taxonomy every caller of the storage router sees. Transient
//! per-backend failures never appear here on their own; they are folded into the
//! aggregate variants together with the per-backend attempt log so operators can
//! diagnose a failure without access to router internals.

use std::io;
use std::time::Duration;

use crate::models::{summarize, BackendAttempt, BackendResult};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like admission rejections
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "RATE_LIMITED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Rate limited on route {route_key}: limit {limit} reached, retry in {}ms", retry_after.as_millis())]
    RateLimited {
        route_key: String,
        limit: u32,
        retry_after: Duration,
    },

    #[error("Upload queue timeout: no write slot freed within {}ms (capacity {capacity})", waited.as_millis())]
    QueueTimeout { waited: Duration, capacity: usize },

    #[error("No backend completed {operation}: [{}]", summarize(attempts))]
    BackendUnavailable {
        operation: &'static str,
        /// Last non-success reply, when any backend replied at all
        last: Option<BackendResult>,
        attempts: Vec<BackendAttempt>,
    },

    #[error("Not found: {message}")]
    NotFound {
        message: String,
        attempts: Vec<BackendAttempt>,
    },

    #[error("Partial success for {operation}: applied on [{}], failed on [{}]", succeeded.join(", "), failed.join(", "))]
    PartialSuccess {
        operation: &'static str,
        succeeded: Vec<String>,
        failed: Vec<String>,
        attempts: Vec<BackendAttempt>,
    },

    #[error("Ambiguous outcome for {operation} on backend {backend}: {reason}")]
    AmbiguousOutcome {
        operation: &'static str,
        backend: String,
        reason: String,
        attempts: Vec<BackendAttempt>,
    },

    #[error("Deadline exceeded for {operation} after {}ms", elapsed.as_millis())]
    DeadlineExceeded {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound {
            message: message.into(),
            attempts: Vec::new(),
        }
    }

    /// Per-backend attempt log attached to router failures.
    pub fn attempts(&self) -> &[BackendAttempt] {
        match self {
            AppError::BackendUnavailable { attempts, .. }
            | AppError::NotFound { attempts, .. }
            | AppError::PartialSuccess { attempts, .. }
            | AppError::AmbiguousOutcome { attempts, .. } => attempts,
            _ => &[],
        }
    }

    /// How long the caller should wait before retrying, when known.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AppError::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::RateLimited { .. } => (
            429,
            "RATE_LIMITED",
            true,
            Some("Wait for the Retry-After interval before sending more requests"),
            false,
            LogLevel::Warn,
        ),
        AppError::QueueTimeout { .. } => (
            503,
            "QUEUE_TIMEOUT",
            true,
            Some("Retry the upload after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::BackendUnavailable { .. } => (
            502,
            "BACKEND_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Error,
        ),
        AppError::NotFound { .. } => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the file key or identifier exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::PartialSuccess { .. } => (
            207,
            "PARTIAL_SUCCESS",
            true,
            Some("Repeat the operation for the failed backends"),
            false,
            LogLevel::Warn,
        ),
        AppError::AmbiguousOutcome { .. } => (
            409,
            "AMBIGUOUS_OUTCOME",
            false,
            Some("Verify the stored file before retrying the upload"),
            false,
            LogLevel::Error,
        ),
        AppError::DeadlineExceeded { .. } => (
            504,
            "DEADLINE_EXCEEDED",
            true,
            Some("Retry with a longer deadline"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Config(_) => (
            500,
            "CONFIGURATION_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::RateLimited { .. } => "Too many requests. Please slow down.".to_string(),
            AppError::QueueTimeout { .. } => {
                "Upload capacity is exhausted. Please retry shortly.".to_string()
            }
            AppError::BackendUnavailable { .. } => {
                "No storage backend could complete the request".to_string()
            }
            AppError::Config(_) | AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }
}
