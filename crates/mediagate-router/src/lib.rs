//! Mediagate Router Library
//!
//! The Delegated Storage Router and what it maintains:
//! - `router`: store / fetch over the backend priority list, patch / delete fan-out
//! - `retry`: bounded exponential backoff
//! - `catalog`: uuid → public URL / backend key index
//! - `invalidation`: sinks for the cache invalidation signal
//! - `gateway`: upload queue admission and deadlines in front of the router

pub mod catalog;
pub mod gateway;
pub mod invalidation;
pub mod retry;
pub mod router;

pub use catalog::CatalogIndex;
pub use gateway::StorageGateway;
pub use invalidation::{
    BroadcastInvalidationSink, CompositeInvalidationSink, InvalidationSink,
    LoggingInvalidationSink,
};
pub use retry::RetryPolicy;
pub use router::{DelegatedStorageRouter, FanoutReport, FetchOutcome, StoreOutcome};
