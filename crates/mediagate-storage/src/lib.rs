//! Mediagate Storage Library
//!
//! This crate defines the contract every storage backend satisfies
//! (`BackendAdapter`: put, get, patch, delete) and the closed set of concrete
//! variants that can be registered at startup.
//!
//! # Key format
//!
//! Backends are addressed by `key_value`, the caller-facing logical path
//! (e.g. `/images/a.webp`). The backend-resident key is the same path without
//! leading slashes; the public URL is the backend's public base joined with
//! that key. Keys must not contain `..`. Key handling is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-http")]
pub mod http;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod traits;

// Re-export commonly used types
pub use factory::create_backends;
#[cfg(feature = "storage-http")]
pub use http::HttpBackend;
pub use mediagate_core::BackendKind;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryBackend;
pub use traits::{AdapterResult, BackendAdapter, BackendError};
