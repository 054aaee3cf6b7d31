//! Cache invalidation signal sinks
//!
//! The router emits an `InvalidationSignal` after a patch or delete was applied
//! by at least one backend. Purging the CDN is someone else's job; a sink only
//! has to hand the signal on.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use mediagate_core::InvalidationSignal;

#[async_trait]
pub trait InvalidationSink: Send + Sync {
    async fn emit(&self, signal: InvalidationSignal);
}

/// Writes each signal as a structured log line
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInvalidationSink;

#[async_trait]
impl InvalidationSink for LoggingInvalidationSink {
    async fn emit(&self, signal: InvalidationSignal) {
        tracing::info!(
            operation = ?signal.operation,
            file_key = %signal.file_key,
            backends = ?signal.backends,
            public_urls = ?signal.public_urls,
            "Cache invalidation signal emitted"
        );
    }
}

/// Publishes signals on a broadcast channel for an external purger
#[derive(Debug, Clone)]
pub struct BroadcastInvalidationSink {
    sender: broadcast::Sender<InvalidationSignal>,
}

impl BroadcastInvalidationSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationSignal> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl InvalidationSink for BroadcastInvalidationSink {
    async fn emit(&self, signal: InvalidationSignal) {
        if self.sender.send(signal).is_err() {
            tracing::trace!("No invalidation subscribers");
        }
    }
}

/// Forwards every signal to each inner sink, in order
#[derive(Clone, Default)]
pub struct CompositeInvalidationSink {
    sinks: Vec<Arc<dyn InvalidationSink>>,
}

impl CompositeInvalidationSink {
    pub fn new(sinks: Vec<Arc<dyn InvalidationSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl InvalidationSink for CompositeInvalidationSink {
    async fn emit(&self, signal: InvalidationSignal) {
        for sink in &self.sinks {
            sink.emit(signal.clone()).await;
        }
    }
}
