//! Mediagate Core Library
//!
//! This crate provides the domain models, error taxonomy, and configuration
//! shared by every Mediagate component: the backend adapters, the delegated
//! storage router, the admission infrastructure, and the HTTP edge.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{
    BackendConfig, Config, RateLimitConfig, RouterConfig, ServerConfig, UploadQueueConfig,
};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AttemptDisposition, BackendAttempt, BackendResult, CatalogEntry, FileKey, FileRecord,
    InvalidationOperation, InvalidationSignal, StorageControlItem, StorageControlRequest,
};
pub use storage_types::BackendKind;
