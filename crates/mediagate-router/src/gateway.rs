//! Storage gateway
//!
//! The write and control pipeline in front of the router: writes take an upload
//! slot before reaching the router, every operation gets a deadline, and the
//! slot is released on every exit path.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use mediagate_core::models::Changes;
use mediagate_core::{AppError, FileKey, FileRecord};
use mediagate_infra::upload_queue::{QueueStats, UploadQueue};

use crate::catalog::CatalogIndex;
use crate::router::{DelegatedStorageRouter, FanoutReport, FetchOutcome, StoreOutcome};

pub struct StorageGateway {
    router: Arc<DelegatedStorageRouter>,
    queue: Arc<UploadQueue>,
    operation_deadline: Duration,
}

impl StorageGateway {
    pub fn new(
        router: Arc<DelegatedStorageRouter>,
        queue: Arc<UploadQueue>,
        operation_deadline: Duration,
    ) -> Self {
        Self {
            router,
            queue,
            operation_deadline,
        }
    }

    /// Deadline for an operation starting now. A requested timeout can only
    /// shorten the configured one.
    pub fn deadline_for(&self, requested: Option<Duration>) -> Instant {
        let budget = requested
            .map(|r| r.min(self.operation_deadline))
            .unwrap_or(self.operation_deadline);
        Instant::now() + budget
    }

    pub async fn store(
        &self,
        record: FileRecord,
        timeout: Option<Duration>,
    ) -> Result<StoreOutcome, AppError> {
        let deadline = self.deadline_for(timeout);
        let slot = self.queue.acquire(Some(deadline)).await?;
        let outcome = self.router.store(&record, deadline).await;
        self.queue.release(slot);
        outcome
    }

    pub async fn fetch(
        &self,
        key_value: &str,
        timeout: Option<Duration>,
    ) -> Result<FetchOutcome, AppError> {
        self.router.fetch(key_value, self.deadline_for(timeout)).await
    }

    pub async fn patch(
        &self,
        key: &FileKey,
        changes: &Changes,
        timeout: Option<Duration>,
    ) -> Result<FanoutReport, AppError> {
        self.router
            .patch(key, changes, self.deadline_for(timeout))
            .await
    }

    pub async fn delete(
        &self,
        key: &FileKey,
        timeout: Option<Duration>,
    ) -> Result<FanoutReport, AppError> {
        self.router.delete(key, self.deadline_for(timeout)).await
    }

    pub fn catalog(&self) -> &Arc<CatalogIndex> {
        self.router.catalog()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub fn backend_ids(&self) -> Vec<String> {
        self.router.backend_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::LoggingInvalidationSink;
    use mediagate_core::{RouterConfig, UploadQueueConfig};
    use mediagate_storage::test_helpers::{Op, Scripted, ScriptedBackend};
    use mediagate_storage::BackendAdapter;

    fn gateway(backend: Arc<ScriptedBackend>, capacity: usize) -> StorageGateway {
        let router = DelegatedStorageRouter::new(
            vec![backend as Arc<dyn BackendAdapter>],
            Arc::new(CatalogIndex::new()),
            Arc::new(LoggingInvalidationSink),
            &RouterConfig::default(),
        )
        .unwrap();
        let queue = UploadQueue::new(&UploadQueueConfig {
            capacity,
            acquire_timeout: Duration::from_secs(1),
        });
        StorageGateway::new(Arc::new(router), Arc::new(queue), Duration::from_secs(30))
    }

    #[tokio::test(start_paused = true)]
    async fn requested_timeout_only_shortens_deadline() {
        let gateway = gateway(ScriptedBackend::new("b1").into_arc(), 1);
        let now = Instant::now();
        assert_eq!(gateway.deadline_for(None) - now, Duration::from_secs(30));
        assert_eq!(
            gateway.deadline_for(Some(Duration::from_secs(5))) - now,
            Duration::from_secs(5)
        );
        assert_eq!(
            gateway.deadline_for(Some(Duration::from_secs(90))) - now,
            Duration::from_secs(30)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slot_is_released_when_store_fails() {
        let backend = ScriptedBackend::new("b1")
            .always(Op::Put, Scripted::Status(400))
            .into_arc();
        let gateway = gateway(backend, 1);

        for name in ["/a.webp", "/b.webp"] {
            let record = FileRecord::new("CMS", "unique_name", name, vec![0u8]);
            assert!(matches!(
                gateway.store(record, None).await,
                Err(AppError::BackendUnavailable { .. })
            ));
        }

        let stats = gateway.queue_stats();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.admitted, 2);
        assert_eq!(stats.timed_out, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stored_files_land_in_catalog() {
        let gateway = gateway(ScriptedBackend::new("b1").into_arc(), 2);
        let record = FileRecord::new("CMS", "unique_name", "/c.webp", vec![9u8]);

        let outcome = gateway.store(record, None).await.unwrap();
        assert_eq!(gateway.catalog().len(), 1);
        assert_eq!(
            gateway.catalog().lookup(&outcome.entry.uuid).unwrap().backend,
            "b1"
        );
        assert_eq!(gateway.backend_ids(), vec!["b1"]);
    }
}
