//! Application state shared by all handlers.

use std::sync::Arc;

use mediagate_core::Config;
use mediagate_infra::RateLimiter;
use mediagate_router::{BroadcastInvalidationSink, StorageGateway};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<StorageGateway>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Subscribe here to receive cache invalidation signals
    pub invalidations: BroadcastInvalidationSink,
}
