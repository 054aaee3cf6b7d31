//! Storage setup and initialization
//!
//! Builds the backend priority list and wires it into the router, the upload
//! queue, and the gateway that handlers talk to.

use anyhow::Result;
use mediagate_core::Config;
use mediagate_infra::UploadQueue;
use mediagate_router::{
    BroadcastInvalidationSink, CatalogIndex, CompositeInvalidationSink, DelegatedStorageRouter,
    InvalidationSink, LoggingInvalidationSink, StorageGateway,
};
use mediagate_storage::{create_backends, BackendAdapter};
use std::sync::Arc;

/// Capacity of the invalidation broadcast channel; slow subscribers lag beyond it.
const INVALIDATION_CHANNEL_CAPACITY: usize = 1024;

/// Create the configured backends in priority order.
pub fn setup_backends(config: &Config) -> Result<Vec<Arc<dyn BackendAdapter>>> {
    tracing::info!("Initializing storage backends...");
    let backends = create_backends(config)?;
    tracing::info!(
        backends = ?backends.iter().map(|b| format!("{}:{}", b.id(), b.kind())).collect::<Vec<_>>(),
        "Storage backends initialized successfully"
    );
    Ok(backends)
}

/// Wire backends into the router and put the upload queue in front of it.
pub fn setup_gateway(
    config: &Config,
    backends: Vec<Arc<dyn BackendAdapter>>,
) -> Result<(Arc<StorageGateway>, BroadcastInvalidationSink)> {
    let broadcast = BroadcastInvalidationSink::new(INVALIDATION_CHANNEL_CAPACITY);
    let sinks: Vec<Arc<dyn InvalidationSink>> = vec![
        Arc::new(LoggingInvalidationSink),
        Arc::new(broadcast.clone()),
    ];

    let router = DelegatedStorageRouter::new(
        backends,
        Arc::new(CatalogIndex::new()),
        Arc::new(CompositeInvalidationSink::new(sinks)),
        &config.router,
    )?;

    let queue = Arc::new(UploadQueue::new(&config.upload_queue));
    tracing::info!(
        capacity = config.upload_queue.capacity,
        acquire_timeout_ms = config.upload_queue.acquire_timeout.as_millis() as u64,
        "Upload queue enabled"
    );

    let gateway = StorageGateway::new(
        Arc::new(router),
        queue,
        config.router.operation_deadline,
    );

    Ok((Arc::new(gateway), broadcast))
}
