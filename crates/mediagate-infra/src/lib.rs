//! Mediagate Infrastructure Library
//!
//! This crate provides the admission and observability components shared by
//! Mediagate services:
//! - Rate limiting (fixed window per route key)
//! - Upload queue (bounded write concurrency)
//! - Middleware (request ID)
//! - Telemetry initialization

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

#[cfg(feature = "upload-queue")]
pub mod upload_queue;

// Re-export commonly used types
#[cfg(feature = "middleware")]
pub use middleware::{get_request_id, request_id_middleware, RequestId};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{RateDecision, RateLimiter};

#[cfg(feature = "upload-queue")]
pub use upload_queue::{QueueStats, UploadQueue, UploadSlot};
