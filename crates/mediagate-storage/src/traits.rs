//! Backend adapter contract
//!
//! This module defines the capability set every storage backend must expose.

use async_trait::async_trait;
use mediagate_core::models::{Changes, FileKey};
use mediagate_core::{BackendKind, BackendResult, FileRecord};
use thiserror::Error;

/// Transport-level failures of a backend call.
///
/// Any reply carrying a status code is a `BackendResult`, never an error;
/// these variants describe calls that produced no usable reply.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never reached the backend
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// No reply within the client timeout; the backend may have applied the call
    #[error("Backend call timed out: {0}")]
    Timeout(String),

    /// The connection broke after the request was sent
    #[error("Backend call interrupted: {0}")]
    Interrupted(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BackendError {
    /// Whether the backend may have applied the call despite the failure.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, BackendError::Timeout(_) | BackendError::Interrupted(_))
    }

    /// Whether repeating the call against the same backend can help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Unreachable(_))
    }

    /// Short label for attempt logs.
    pub fn label(&self) -> &'static str {
        match self {
            BackendError::Unreachable(_) => "unreachable",
            BackendError::Timeout(_) => "timeout",
            BackendError::Interrupted(_) => "interrupted",
            BackendError::InvalidKey(_) => "invalid_key",
            BackendError::ConfigError(_) => "config_error",
        }
    }
}

/// Result type for backend calls
pub type AdapterResult = Result<BackendResult, BackendError>;

/// Backend adapter contract
///
/// All storage integrations implement this trait. The router only ever talks
/// to backends through it and only ever sees `BackendResult` replies.
///
/// `get` must be idempotent. `put`, `patch` and `delete` are not assumed to be;
/// a backend whose `put` is a keyed overwrite reports it through
/// `idempotent_writes` so the router may retry it after an ambiguous failure.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Identity in the configured priority list
    fn id(&self) -> &str;

    fn kind(&self) -> BackendKind;

    fn idempotent_writes(&self) -> bool;

    /// Public URL under which this backend serves `storage_key`
    fn public_url(&self, storage_key: &str) -> String;

    /// Store a file. Successful replies may carry `key` / `url` in the
    /// structured body; otherwise both are derived from `key_value`.
    async fn put(&self, record: &FileRecord) -> AdapterResult;

    /// Read a file by its logical key
    async fn get(&self, key_value: &str) -> AdapterResult;

    /// Apply `changes` to a stored file (e.g. mark it expired)
    async fn patch(&self, key: &FileKey, changes: &Changes) -> AdapterResult;

    async fn delete(&self, key: &FileKey) -> AdapterResult;
}
