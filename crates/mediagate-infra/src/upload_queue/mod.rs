//! Upload queue
//!
//! Bounded admission for write operations: at most `capacity` uploads are in
//! flight across the whole process. Callers wait for a slot up to the acquire
//! timeout (or their own deadline, whichever is sooner) and are told so when it
//! runs out; no caller is dropped silently.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use mediagate_core::{AppError, UploadQueueConfig};

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    admitted: AtomicU64,
    timed_out: AtomicU64,
}

/// Snapshot of queue activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub capacity: usize,
    pub available: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub admitted: u64,
    pub timed_out: u64,
}

/// Admission ticket for one write operation
///
/// The slot is returned to the queue when dropped, so every exit path of the
/// guarded operation (success, error, cancellation) releases it exactly once.
#[derive(Debug)]
pub struct UploadSlot {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
    acquired_at: Instant,
}

impl UploadSlot {
    /// How long the slot has been held
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl Drop for UploadSlot {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct UploadQueue {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Duration,
    counters: Arc<Counters>,
}

impl UploadQueue {
    pub fn new(config: &UploadQueueConfig) -> Self {
        let capacity = config.capacity.max(1);
        tracing::info!(
            capacity = capacity,
            acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
            "Upload queue initialized"
        );
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            acquire_timeout: config.acquire_timeout,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait for a write slot.
    ///
    /// Fails with `QueueTimeout` when no slot frees within the acquire timeout,
    /// or with `DeadlineExceeded` when the caller's deadline comes first.
    #[tracing::instrument(skip(self), fields(capacity = self.capacity))]
    pub async fn acquire(&self, deadline: Option<Instant>) -> Result<UploadSlot, AppError> {
        let started = Instant::now();
        let queue_deadline = started + self.acquire_timeout;
        let caller_bound = deadline.is_some_and(|d| d < queue_deadline);
        let wait_until = match deadline {
            Some(d) if caller_bound => d,
            _ => queue_deadline,
        };

        let permit = match tokio::time::timeout_at(
            wait_until,
            self.semaphore.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(AppError::Internal("Upload queue is closed".to_string())),
            Err(_) => {
                self.counters.timed_out.fetch_add(1, Ordering::SeqCst);
                let waited = started.elapsed();
                tracing::warn!(
                    waited_ms = waited.as_millis() as u64,
                    in_flight = self.counters.in_flight.load(Ordering::SeqCst),
                    caller_deadline = caller_bound,
                    "No upload slot freed in time"
                );
                return Err(if caller_bound {
                    AppError::DeadlineExceeded {
                        operation: "acquire",
                        elapsed: waited,
                    }
                } else {
                    AppError::QueueTimeout {
                        waited,
                        capacity: self.capacity,
                    }
                });
            }
        };

        let in_flight = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .peak_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);
        self.counters.admitted.fetch_add(1, Ordering::SeqCst);

        tracing::trace!(
            in_flight = in_flight,
            waited_ms = started.elapsed().as_millis() as u64,
            "Upload slot acquired"
        );

        Ok(UploadSlot {
            _permit: permit,
            counters: self.counters.clone(),
            acquired_at: Instant::now(),
        })
    }

    /// Return a slot to the queue. Equivalent to dropping it.
    pub fn release(&self, slot: UploadSlot) {
        tracing::trace!(held_ms = slot.held_for().as_millis() as u64, "Upload slot released");
        drop(slot);
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            capacity: self.capacity,
            available: self.semaphore.available_permits(),
            in_flight: self.counters.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.counters.peak_in_flight.load(Ordering::SeqCst),
            admitted: self.counters.admitted.load(Ordering::SeqCst),
            timed_out: self.counters.timed_out.load(Ordering::SeqCst),
        }
    }
}
