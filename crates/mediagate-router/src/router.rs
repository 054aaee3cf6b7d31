//! Delegated Storage Router
//!
//! Executes one logical file operation against the configured backends:
//!
//! - `store` and `fetch` walk the priority list strictly in order and stop at
//!   the first success.
//! - `patch` and `delete` fan out to every backend in parallel and report the
//!   aggregate, surfacing partial outcomes as `PartialSuccess`.
//!
//! Every backend call is bounded by the per-attempt timeout and by the caller's
//! deadline. Only the aggregate outcome leaves the router; the per-backend
//! attempt log travels with it for diagnosis.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio::time::Instant;

use mediagate_core::models::Changes;
use mediagate_core::{
    AppError, AttemptDisposition, BackendAttempt, BackendResult, CatalogEntry, FileKey,
    FileRecord, InvalidationOperation, InvalidationSignal, RouterConfig,
};
use mediagate_storage::{keys, AdapterResult, BackendAdapter, BackendError};

use crate::catalog::CatalogIndex;
use crate::invalidation::InvalidationSink;
use crate::retry::RetryPolicy;

/// Result of a successful `store`
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    pub entry: Arc<CatalogEntry>,
    pub result: BackendResult,
    pub attempts: Vec<BackendAttempt>,
}

/// Result of a successful `fetch`
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub backend: String,
    pub result: BackendResult,
    pub attempts: Vec<BackendAttempt>,
}

/// Result of a fan-out operation that no backend failed
#[derive(Debug, Clone)]
pub struct FanoutReport {
    pub operation: &'static str,
    /// Backends that applied the change
    pub succeeded: Vec<String>,
    /// Backends that did not hold the object
    pub absent: Vec<String>,
    pub attempts: Vec<BackendAttempt>,
}

/// What one bounded backend call produced
enum CallOutcome {
    Reply(BackendResult),
    Failed(BackendError),
    /// The caller's deadline ran out before the backend answered
    DeadlineExpired,
}

enum TargetOutcome {
    Applied,
    Absent,
    Failed,
}

struct TargetReport {
    index: usize,
    backend: String,
    outcome: TargetOutcome,
    attempt: BackendAttempt,
    deadline_hit: bool,
}

pub struct DelegatedStorageRouter {
    backends: Vec<Arc<dyn BackendAdapter>>,
    catalog: Arc<CatalogIndex>,
    invalidation: Arc<dyn InvalidationSink>,
    retry: RetryPolicy,
    attempt_timeout: Duration,
}

impl DelegatedStorageRouter {
    pub fn new(
        backends: Vec<Arc<dyn BackendAdapter>>,
        catalog: Arc<CatalogIndex>,
        invalidation: Arc<dyn InvalidationSink>,
        config: &RouterConfig,
    ) -> Result<Self, AppError> {
        if backends.is_empty() {
            return Err(AppError::Config(
                "Storage router needs at least one backend".to_string(),
            ));
        }

        tracing::info!(
            backends = ?backends.iter().map(|b| b.id()).collect::<Vec<_>>(),
            max_retries = config.max_retries,
            attempt_timeout_ms = config.attempt_timeout.as_millis() as u64,
            "Delegated storage router initialized"
        );

        Ok(Self {
            backends,
            catalog,
            invalidation,
            retry: RetryPolicy::from_config(config),
            attempt_timeout: config.attempt_timeout,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn catalog(&self) -> &Arc<CatalogIndex> {
        &self.catalog
    }

    pub fn backend_ids(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.id().to_string()).collect()
    }

    /// Run one backend call bounded by the attempt timeout and the deadline.
    async fn call<F>(&self, deadline: Instant, call: F) -> CallOutcome
    where
        F: Future<Output = AdapterResult>,
    {
        let attempt_limit = Instant::now() + self.attempt_timeout;
        let limit = attempt_limit.min(deadline);

        match tokio::time::timeout_at(limit, call).await {
            Ok(Ok(result)) => CallOutcome::Reply(result),
            Ok(Err(err)) => CallOutcome::Failed(err),
            Err(_) if deadline <= attempt_limit => CallOutcome::DeadlineExpired,
            Err(_) => CallOutcome::Failed(BackendError::Timeout(format!(
                "no reply within {}ms",
                self.attempt_timeout.as_millis()
            ))),
        }
    }

    /// Store a file on the first backend, in priority order, that accepts it.
    ///
    /// 5xx replies and unreachable backends are retried with backoff, then fall
    /// through; 4xx replies fall through at once. A timeout or interrupted call
    /// on a backend without idempotent writes ends the operation with
    /// `AmbiguousOutcome`, since the file may already be stored there.
    #[tracing::instrument(
        skip(self, record, deadline),
        fields(namespace = %record.storage_type, key_value = %record.key_value, size = record.payload.len())
    )]
    pub async fn store(
        &self,
        record: &FileRecord,
        deadline: Instant,
    ) -> Result<StoreOutcome, AppError> {
        keys::validate_key_value(&record.key_value)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let started = Instant::now();
        let mut attempts = Vec::new();
        let mut last: Option<BackendResult> = None;

        for adapter in &self.backends {
            let backend = adapter.id();
            let mut attempt = 0u32;

            loop {
                attempt += 1;
                if Instant::now() >= deadline {
                    return Err(self.deadline_exceeded("store", started, &attempts));
                }

                let call_started = Instant::now();
                let outcome = self.call(deadline, adapter.put(record)).await;
                let elapsed_ms = call_started.elapsed().as_millis() as u64;

                let retry = match outcome {
                    CallOutcome::Reply(result) if result.is_success() => {
                        attempts.push(BackendAttempt::status(
                            backend,
                            attempt,
                            result.status_code,
                            AttemptDisposition::Succeeded,
                            elapsed_ms,
                        ));
                        return Ok(self.finish_store(adapter, record, result, attempts));
                    }
                    CallOutcome::Reply(result) => {
                        let retry = result.is_server_error() && self.retry.allows_retry(attempt);
                        attempts.push(BackendAttempt::status(
                            backend,
                            attempt,
                            result.status_code,
                            if retry {
                                AttemptDisposition::Retried
                            } else {
                                AttemptDisposition::FellThrough
                            },
                            elapsed_ms,
                        ));
                        tracing::debug!(
                            backend = %backend,
                            attempt = attempt,
                            status = result.status_code,
                            retry = retry,
                            "Backend rejected store"
                        );
                        last = Some(result);
                        retry
                    }
                    CallOutcome::Failed(err)
                        if err.is_ambiguous() && !adapter.idempotent_writes() =>
                    {
                        attempts.push(BackendAttempt::error(
                            backend,
                            attempt,
                            err.label(),
                            AttemptDisposition::Ambiguous,
                            elapsed_ms,
                        ));
                        tracing::warn!(
                            backend = %backend,
                            attempt = attempt,
                            error = %err,
                            "Store outcome unknown on non-idempotent backend"
                        );
                        return Err(AppError::AmbiguousOutcome {
                            operation: "store",
                            backend: backend.to_string(),
                            reason: err.to_string(),
                            attempts,
                        });
                    }
                    CallOutcome::Failed(err) => {
                        let retry = (err.is_retryable() || err.is_ambiguous())
                            && self.retry.allows_retry(attempt);
                        attempts.push(BackendAttempt::error(
                            backend,
                            attempt,
                            err.label(),
                            if retry {
                                AttemptDisposition::Retried
                            } else {
                                AttemptDisposition::FellThrough
                            },
                            elapsed_ms,
                        ));
                        tracing::debug!(
                            backend = %backend,
                            attempt = attempt,
                            error = %err,
                            retry = retry,
                            "Backend store call failed"
                        );
                        retry
                    }
                    CallOutcome::DeadlineExpired => {
                        attempts.push(BackendAttempt::error(
                            backend,
                            attempt,
                            "deadline",
                            AttemptDisposition::Ambiguous,
                            elapsed_ms,
                        ));
                        return Err(self.deadline_exceeded("store", started, &attempts));
                    }
                };

                if !retry {
                    break;
                }

                let delay = self.retry.next_delay(attempt);
                tokio::time::sleep_until((Instant::now() + delay).min(deadline)).await;
            }
        }

        tracing::warn!(attempts = attempts.len(), "No backend accepted store");
        Err(AppError::BackendUnavailable {
            operation: "store",
            last,
            attempts,
        })
    }

    fn finish_store(
        &self,
        adapter: &Arc<dyn BackendAdapter>,
        record: &FileRecord,
        result: BackendResult,
        attempts: Vec<BackendAttempt>,
    ) -> StoreOutcome {
        let backend_key = result
            .structured_str("key")
            .map(str::to_string)
            .unwrap_or_else(|| keys::storage_key(&record.key_value));
        let public_url = result
            .structured_str("url")
            .map(str::to_string)
            .unwrap_or_else(|| adapter.public_url(&backend_key));

        let entry = self.catalog.record_store(
            &record.file_key(),
            adapter.id(),
            &backend_key,
            &public_url,
        );

        tracing::info!(
            backend = %adapter.id(),
            uuid = %entry.uuid,
            public_url = %entry.public_url,
            attempts = attempts.len(),
            "File stored"
        );

        StoreOutcome {
            entry,
            result,
            attempts,
        }
    }

    /// Read a file from the first backend, in priority order, that has it.
    ///
    /// Any non-success falls through. `NotFound` is reported only when every
    /// backend answered that the object is absent.
    #[tracing::instrument(skip(self, deadline))]
    pub async fn fetch(&self, key_value: &str, deadline: Instant) -> Result<FetchOutcome, AppError> {
        keys::validate_key_value(key_value).map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let started = Instant::now();
        let mut attempts = Vec::new();
        let mut last: Option<BackendResult> = None;
        let mut any_failed = false;

        for adapter in &self.backends {
            let backend = adapter.id();
            if Instant::now() >= deadline {
                return Err(self.deadline_exceeded("fetch", started, &attempts));
            }

            let call_started = Instant::now();
            let outcome = self.call(deadline, adapter.get(key_value)).await;
            let elapsed_ms = call_started.elapsed().as_millis() as u64;

            match outcome {
                CallOutcome::Reply(result) if result.is_success() => {
                    attempts.push(BackendAttempt::status(
                        backend,
                        1,
                        result.status_code,
                        AttemptDisposition::Succeeded,
                        elapsed_ms,
                    ));
                    return Ok(FetchOutcome {
                        backend: backend.to_string(),
                        result,
                        attempts,
                    });
                }
                CallOutcome::Reply(result) => {
                    any_failed |= !result.is_not_found();
                    attempts.push(BackendAttempt::status(
                        backend,
                        1,
                        result.status_code,
                        AttemptDisposition::FellThrough,
                        elapsed_ms,
                    ));
                    last = Some(result);
                }
                CallOutcome::Failed(err) => {
                    any_failed = true;
                    attempts.push(BackendAttempt::error(
                        backend,
                        1,
                        err.label(),
                        AttemptDisposition::FellThrough,
                        elapsed_ms,
                    ));
                }
                CallOutcome::DeadlineExpired => {
                    return Err(self.deadline_exceeded("fetch", started, &attempts));
                }
            }
        }

        if any_failed {
            Err(AppError::BackendUnavailable {
                operation: "fetch",
                last,
                attempts,
            })
        } else {
            Err(AppError::NotFound {
                message: format!("'{}' is not stored on any backend", key_value),
                attempts,
            })
        }
    }

    /// Apply `changes` on every backend that may hold the file.
    #[tracing::instrument(skip(self, changes, deadline), fields(file_key = %key))]
    pub async fn patch(
        &self,
        key: &FileKey,
        changes: &Changes,
        deadline: Instant,
    ) -> Result<FanoutReport, AppError> {
        validate_file_key(key)?;
        let target = key.clone();
        let patch = changes.clone();
        let outcome = self
            .fan_out("patch", deadline, move |adapter| {
                let key = target.clone();
                let changes = patch.clone();
                async move { adapter.patch(&key, &changes).await }
            })
            .await;

        self.conclude(
            InvalidationOperation::Patch,
            key,
            Some(changes),
            outcome,
        )
        .await
    }

    /// Delete the file from every backend that may hold it.
    ///
    /// The catalog entry is removed only when no backend failed.
    #[tracing::instrument(skip(self, deadline), fields(file_key = %key))]
    pub async fn delete(&self, key: &FileKey, deadline: Instant) -> Result<FanoutReport, AppError> {
        validate_file_key(key)?;
        let target = key.clone();
        let outcome = self
            .fan_out("delete", deadline, move |adapter| {
                let key = target.clone();
                async move { adapter.delete(&key).await }
            })
            .await;

        self.conclude(InvalidationOperation::Delete, key, None, outcome)
            .await
    }

    /// Launch one independent task per backend and wait for all of them.
    async fn fan_out<F, Fut>(
        &self,
        operation: &'static str,
        deadline: Instant,
        call: F,
    ) -> (Vec<TargetReport>, Duration)
    where
        F: Fn(Arc<dyn BackendAdapter>) -> Fut,
        Fut: Future<Output = AdapterResult> + Send + 'static,
    {
        let started = Instant::now();
        let mut tasks = JoinSet::new();

        for (index, adapter) in self.backends.iter().enumerate() {
            let backend = adapter.id().to_string();
            let fut = call(adapter.clone());
            let attempt_limit = Instant::now() + self.attempt_timeout;
            let limit = attempt_limit.min(deadline);

            tasks.spawn(async move {
                let call_started = Instant::now();
                let outcome = tokio::time::timeout_at(limit, fut).await;
                let elapsed_ms = call_started.elapsed().as_millis() as u64;
                let deadline_hit = outcome.is_err() && deadline <= attempt_limit;
                classify_target(index, backend, outcome, elapsed_ms, deadline_hit)
            });
        }

        let mut reports = Vec::with_capacity(self.backends.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(operation = operation, error = %e, "Fan-out task failed"),
            }
        }

        // A task that panicked still has to be accounted for.
        for (index, adapter) in self.backends.iter().enumerate() {
            if !reports.iter().any(|r| r.index == index) {
                reports.push(TargetReport {
                    index,
                    backend: adapter.id().to_string(),
                    outcome: TargetOutcome::Failed,
                    attempt: BackendAttempt::error(
                        adapter.id(),
                        1,
                        "task_failed",
                        AttemptDisposition::Failed,
                        0,
                    ),
                    deadline_hit: false,
                });
            }
        }

        reports.sort_by_key(|r| r.index);
        (reports, started.elapsed())
    }

    /// Turn fan-out reports into the aggregate outcome, update the catalog,
    /// and emit the invalidation signal for backends that applied the change.
    async fn conclude(
        &self,
        operation: InvalidationOperation,
        key: &FileKey,
        changes: Option<&Changes>,
        (reports, elapsed): (Vec<TargetReport>, Duration),
    ) -> Result<FanoutReport, AppError> {
        let name = match operation {
            InvalidationOperation::Patch => "patch",
            InvalidationOperation::Delete => "delete",
        };

        let mut succeeded = Vec::new();
        let mut absent = Vec::new();
        let mut failed = Vec::new();
        let mut attempts = Vec::with_capacity(reports.len());
        let mut deadline_hit = false;

        for report in reports {
            match report.outcome {
                TargetOutcome::Applied => succeeded.push(report.backend),
                TargetOutcome::Absent => absent.push(report.backend),
                TargetOutcome::Failed => failed.push(report.backend),
            }
            deadline_hit |= report.deadline_hit;
            attempts.push(report.attempt);
        }

        if !succeeded.is_empty() {
            self.emit_signal(operation, key, changes, &succeeded).await;
        }

        if operation == InvalidationOperation::Delete && failed.is_empty() {
            if let Some(entry) = self.catalog.remove_key(key) {
                tracing::debug!(uuid = %entry.uuid, "Catalog entry removed");
            }
        }

        tracing::info!(
            operation = name,
            succeeded = ?succeeded,
            absent = ?absent,
            failed = ?failed,
            duration_ms = elapsed.as_millis() as u64,
            "Fan-out completed"
        );

        if deadline_hit {
            return Err(AppError::DeadlineExceeded {
                operation: name,
                elapsed,
            });
        }

        if failed.is_empty() {
            if succeeded.is_empty() {
                return Err(AppError::NotFound {
                    message: format!("{} is not stored on any backend", key),
                    attempts,
                });
            }
            return Ok(FanoutReport {
                operation: name,
                succeeded,
                absent,
                attempts,
            });
        }

        if succeeded.is_empty() && absent.is_empty() {
            return Err(AppError::BackendUnavailable {
                operation: name,
                last: None,
                attempts,
            });
        }

        Err(AppError::PartialSuccess {
            operation: name,
            succeeded,
            failed,
            attempts,
        })
    }

    async fn emit_signal(
        &self,
        operation: InvalidationOperation,
        key: &FileKey,
        changes: Option<&Changes>,
        applied: &[String],
    ) {
        let storage_key = keys::storage_key(&key.key_value);
        let mut public_urls: Vec<String> = self
            .backends
            .iter()
            .filter(|b| applied.iter().any(|id| id == b.id()))
            .map(|b| b.public_url(&storage_key))
            .collect();
        if let Some(entry) = self.catalog.lookup_key(key) {
            if !public_urls.contains(&entry.public_url) {
                public_urls.push(entry.public_url.clone());
            }
        }

        self.invalidation
            .emit(InvalidationSignal {
                operation,
                file_key: key.clone(),
                backends: applied.to_vec(),
                public_urls,
                changes: changes.cloned(),
                emitted_at: Utc::now(),
            })
            .await;
    }

    fn deadline_exceeded(
        &self,
        operation: &'static str,
        started: Instant,
        attempts: &[BackendAttempt],
    ) -> AppError {
        let elapsed = started.elapsed();
        tracing::warn!(
            operation = operation,
            elapsed_ms = elapsed.as_millis() as u64,
            attempts = attempts.len(),
            "Operation deadline exceeded"
        );
        AppError::DeadlineExceeded { operation, elapsed }
    }
}

fn validate_file_key(key: &FileKey) -> Result<(), AppError> {
    if key.namespace.trim().is_empty() || key.key_name.trim().is_empty() {
        return Err(AppError::InvalidInput(format!(
            "File key {} needs a namespace and a key name",
            key
        )));
    }
    keys::validate_key_value(&key.key_value).map_err(|e| AppError::InvalidInput(e.to_string()))
}

fn classify_target(
    index: usize,
    backend: String,
    outcome: Result<AdapterResult, tokio::time::error::Elapsed>,
    elapsed_ms: u64,
    deadline_hit: bool,
) -> TargetReport {
    let (outcome, attempt) = match outcome {
        Ok(Ok(result)) if result.is_success() => (
            TargetOutcome::Applied,
            BackendAttempt::status(
                &backend,
                1,
                result.status_code,
                AttemptDisposition::Succeeded,
                elapsed_ms,
            ),
        ),
        Ok(Ok(result)) if result.is_not_found() => (
            TargetOutcome::Absent,
            BackendAttempt::status(
                &backend,
                1,
                result.status_code,
                AttemptDisposition::Absent,
                elapsed_ms,
            ),
        ),
        Ok(Ok(result)) => (
            TargetOutcome::Failed,
            BackendAttempt::status(
                &backend,
                1,
                result.status_code,
                AttemptDisposition::Failed,
                elapsed_ms,
            ),
        ),
        Ok(Err(err)) => (
            TargetOutcome::Failed,
            BackendAttempt::error(
                &backend,
                1,
                err.label(),
                if err.is_ambiguous() {
                    AttemptDisposition::Ambiguous
                } else {
                    AttemptDisposition::Failed
                },
                elapsed_ms,
            ),
        ),
        Err(_) => (
            TargetOutcome::Failed,
            BackendAttempt::error(
                &backend,
                1,
                if deadline_hit { "deadline" } else { "timeout" },
                AttemptDisposition::Ambiguous,
                elapsed_ms,
            ),
        ),
    };

    TargetReport {
        index,
        backend,
        outcome,
        attempt,
        deadline_hit,
    }
}
