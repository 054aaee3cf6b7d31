//! Mediagate HTTP edge
//!
//! A thin axum adapter over the storage gateway: multipart uploads, public file
//! serving, storage-control batches, and the catalog. Exposed as a library so
//! integration tests can build the same router the binary serves.

pub mod constants;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
