use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use mediagate_core::models::Changes;
use mediagate_core::{
    AppError, AttemptDisposition, FileKey, FileRecord, InvalidationOperation, RouterConfig,
};
use mediagate_router::{BroadcastInvalidationSink, CatalogIndex, DelegatedStorageRouter};
use mediagate_storage::test_helpers::{Op, Scripted, ScriptedBackend};
use mediagate_storage::BackendAdapter;

struct Harness {
    router: DelegatedStorageRouter,
    catalog: Arc<CatalogIndex>,
    signals: tokio::sync::broadcast::Receiver<mediagate_core::InvalidationSignal>,
}

fn harness(backends: &[Arc<ScriptedBackend>], config: RouterConfig) -> Harness {
    let catalog = Arc::new(CatalogIndex::new());
    let sink = BroadcastInvalidationSink::new(16);
    let signals = sink.subscribe();
    let adapters = backends
        .iter()
        .map(|b| b.clone() as Arc<dyn BackendAdapter>)
        .collect();
    let router =
        DelegatedStorageRouter::new(adapters, catalog.clone(), Arc::new(sink), &config).unwrap();
    Harness {
        router,
        catalog,
        signals,
    }
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

fn record(name: &str, payload: &[u8]) -> FileRecord {
    FileRecord::new("CMS", "unique_name", format!("/{}", name), payload.to_vec())
        .with_content_type("image/webp")
}

fn expired() -> Changes {
    let mut changes = Changes::new();
    changes.insert("expired".to_string(), "true".to_string());
    changes
}

async fn seed(backend: &ScriptedBackend, record: &FileRecord) {
    backend.store().put(record).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn store_retries_same_backend_before_falling_through() {
    let b1 = ScriptedBackend::new("b1")
        .then(Op::Put, [Scripted::Status(500), Scripted::Status(500)])
        .into_arc();
    let b2 = ScriptedBackend::new("b2").into_arc();
    let h = harness(&[b1.clone(), b2.clone()], RouterConfig::default());

    let outcome = h.router.store(&record("a.webp", b"RIFF"), deadline()).await.unwrap();

    assert_eq!(outcome.entry.backend, "b1");
    assert_eq!(b1.calls(Op::Put), 3);
    assert_eq!(b2.calls(Op::Put), 0);
    let dispositions: Vec<_> = outcome.attempts.iter().map(|a| a.disposition).collect();
    assert_eq!(
        dispositions,
        vec![
            AttemptDisposition::Retried,
            AttemptDisposition::Retried,
            AttemptDisposition::Succeeded
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn store_falls_through_on_client_error() {
    let b1 = ScriptedBackend::new("b1")
        .always(Op::Put, Scripted::Status(404))
        .into_arc();
    let b2 = ScriptedBackend::new("b2").into_arc();
    let h = harness(&[b1.clone(), b2.clone()], RouterConfig::default());

    let outcome = h.router.store(&record("b.webp", b"img"), deadline()).await.unwrap();

    assert_eq!(outcome.entry.backend, "b2");
    assert_eq!(b1.calls(Op::Put), 1);
    assert_eq!(outcome.attempts[0].status_code, Some(404));
    assert_eq!(outcome.attempts[0].disposition, AttemptDisposition::FellThrough);
    assert_eq!(outcome.entry.public_url, "https://b2.example.com/b.webp");
    assert_eq!(outcome.entry.backend_key, "b.webp");
}

#[tokio::test(start_paused = true)]
async fn store_then_fetch_round_trips_payload() {
    let b1 = ScriptedBackend::new("b1")
        .always(Op::Put, Scripted::Status(503))
        .into_arc();
    let b2 = ScriptedBackend::new("b2").into_arc();
    let h = harness(&[b1, b2], RouterConfig::default());

    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    h.router
        .store(&record("round/trip.bin", &payload), deadline())
        .await
        .unwrap();

    let fetched = h.router.fetch("/round/trip.bin", deadline()).await.unwrap();
    assert_eq!(fetched.backend, "b2");
    assert_eq!(fetched.result.body.as_deref(), Some(payload.as_slice()));
}

#[tokio::test(start_paused = true)]
async fn store_reports_every_attempt_when_all_backends_fail() {
    let b1 = ScriptedBackend::new("b1")
        .always(Op::Put, Scripted::Status(503))
        .into_arc();
    let b2 = ScriptedBackend::new("b2")
        .always(Op::Put, Scripted::Unreachable)
        .into_arc();
    let h = harness(&[b1, b2], RouterConfig::default());

    match h.router.store(&record("c.webp", b"x"), deadline()).await {
        Err(AppError::BackendUnavailable {
            operation,
            last,
            attempts,
        }) => {
            assert_eq!(operation, "store");
            assert_eq!(last.map(|r| r.status_code), Some(503));
            assert_eq!(attempts.len(), 6);
            assert!(attempts[..3].iter().all(|a| a.backend == "b1"));
            assert_eq!(attempts[5].error.as_deref(), Some("unreachable"));
        }
        other => panic!("expected BackendUnavailable, got {:?}", other),
    }
    assert!(h.catalog.is_empty());
}

#[tokio::test(start_paused = true)]
async fn ambiguous_put_on_non_idempotent_backend_is_not_retried() {
    let b1 = ScriptedBackend::new("b1")
        .then(Op::Put, [Scripted::Timeout])
        .into_arc();
    let b2 = ScriptedBackend::new("b2").into_arc();
    let h = harness(&[b1.clone(), b2.clone()], RouterConfig::default());

    let err = h
        .router
        .store(&record("d.webp", b"x"), deadline())
        .await
        .unwrap_err();

    match err {
        AppError::AmbiguousOutcome {
            backend, attempts, ..
        } => {
            assert_eq!(backend, "b1");
            assert_eq!(attempts[0].disposition, AttemptDisposition::Ambiguous);
        }
        other => panic!("expected AmbiguousOutcome, got {:?}", other),
    }
    assert_eq!(b1.calls(Op::Put), 1);
    assert_eq!(b2.calls(Op::Put), 0);
}

#[tokio::test(start_paused = true)]
async fn ambiguous_put_on_idempotent_backend_is_retried() {
    let b1 = ScriptedBackend::new("b1")
        .with_idempotent_writes(true)
        .then(Op::Put, [Scripted::Interrupted])
        .into_arc();
    let h = harness(&[b1.clone()], RouterConfig::default());

    let outcome = h.router.store(&record("e.webp", b"x"), deadline()).await.unwrap();
    assert_eq!(outcome.entry.backend, "b1");
    assert_eq!(b1.calls(Op::Put), 2);
}

#[tokio::test(start_paused = true)]
async fn attempt_timeout_on_non_idempotent_backend_is_ambiguous() {
    let b1 = ScriptedBackend::new("b1")
        .then(Op::Put, [Scripted::Hang])
        .into_arc();
    let config = RouterConfig {
        attempt_timeout: Duration::from_millis(500),
        ..RouterConfig::default()
    };
    let h = harness(&[b1], config);

    assert!(matches!(
        h.router.store(&record("f.webp", b"x"), deadline()).await,
        Err(AppError::AmbiguousOutcome { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn hung_backend_hits_caller_deadline() {
    let b1 = ScriptedBackend::new("b1")
        .always(Op::Put, Scripted::Hang)
        .into_arc();
    let h = harness(&[b1], RouterConfig::default());

    let started = Instant::now();
    let result = h
        .router
        .store(
            &record("g.webp", b"x"),
            Instant::now() + Duration::from_secs(1),
        )
        .await;

    assert!(matches!(
        result,
        Err(AppError::DeadlineExceeded {
            operation: "store",
            ..
        })
    ));
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(1) && waited < Duration::from_millis(1_010));
}

#[tokio::test(start_paused = true)]
async fn fetch_falls_through_absent_backends() {
    let b1 = ScriptedBackend::new("b1").into_arc();
    let b2 = ScriptedBackend::new("b2").into_arc();
    seed(&b2, &record("h.webp", b"second")).await;
    let h = harness(&[b1.clone(), b2], RouterConfig::default());

    let fetched = h.router.fetch("/h.webp", deadline()).await.unwrap();
    assert_eq!(fetched.backend, "b2");
    assert_eq!(fetched.attempts[0].status_code, Some(404));
    assert_eq!(b1.calls(Op::Get), 1);
}

#[tokio::test(start_paused = true)]
async fn fetch_distinguishes_absent_from_unavailable() {
    let b1 = ScriptedBackend::new("b1").into_arc();
    let b2 = ScriptedBackend::new("b2").into_arc();
    let h = harness(&[b1, b2], RouterConfig::default());
    assert!(matches!(
        h.router.fetch("/missing.webp", deadline()).await,
        Err(AppError::NotFound { .. })
    ));

    let b1 = ScriptedBackend::new("b1")
        .always(Op::Get, Scripted::Status(502))
        .into_arc();
    let b2 = ScriptedBackend::new("b2").into_arc();
    let h = harness(&[b1, b2], RouterConfig::default());
    assert!(matches!(
        h.router.fetch("/missing.webp", deadline()).await,
        Err(AppError::BackendUnavailable {
            operation: "fetch",
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn patch_reports_partial_success_and_signals_applied_backends() {
    let b1 = ScriptedBackend::new("b1").into_arc();
    let b2 = ScriptedBackend::new("b2")
        .always(Op::Patch, Scripted::Status(500))
        .into_arc();
    let file = FileRecord::new("CMS", "unique_name", "/x.jpg", vec![1u8, 2, 3]);
    seed(&b1, &file).await;
    seed(&b2, &file).await;
    let mut h = harness(&[b1.clone(), b2.clone()], RouterConfig::default());

    let key = FileKey::new("CMS", "unique_name", "/x.jpg");
    match h.router.patch(&key, &expired(), deadline()).await {
        Err(AppError::PartialSuccess {
            operation,
            succeeded,
            failed,
            ..
        }) => {
            assert_eq!(operation, "patch");
            assert_eq!(succeeded, vec!["b1"]);
            assert_eq!(failed, vec!["b2"]);
        }
        other => panic!("expected PartialSuccess, got {:?}", other),
    }

    assert_eq!(
        b1.store().metadata("/x.jpg").unwrap().get("expired").map(String::as_str),
        Some("true")
    );
    assert!(b2.store().metadata("/x.jpg").unwrap().get("expired").is_none());

    let signal = h.signals.try_recv().unwrap();
    assert_eq!(signal.operation, InvalidationOperation::Patch);
    assert_eq!(signal.backends, vec!["b1"]);
    assert_eq!(signal.public_urls, vec!["https://b1.example.com/x.jpg"]);
    assert_eq!(signal.changes, Some(expired()));
}

#[tokio::test(start_paused = true)]
async fn complete_delete_removes_catalog_entry() {
    let b1 = ScriptedBackend::new("b1").into_arc();
    let b2 = ScriptedBackend::new("b2").into_arc();
    let mut h = harness(&[b1.clone(), b2.clone()], RouterConfig::default());

    let stored = h
        .router
        .store(&record("y.webp", b"x"), deadline())
        .await
        .unwrap();
    let key = stored.entry.file_key.clone();

    let report = h.router.delete(&key, deadline()).await.unwrap();
    assert_eq!(report.succeeded, vec!["b1"]);
    assert_eq!(report.absent, vec!["b2"]);
    assert!(h.catalog.lookup(&stored.entry.uuid).is_none());
    assert!(!b1.store().contains("/y.webp"));

    let signal = h.signals.try_recv().unwrap();
    assert_eq!(signal.operation, InvalidationOperation::Delete);
    assert_eq!(signal.backends, vec!["b1"]);
}

#[tokio::test(start_paused = true)]
async fn hung_fan_out_target_does_not_stall_siblings() {
    let b1 = ScriptedBackend::new("b1").into_arc();
    let b2 = ScriptedBackend::new("b2")
        .always(Op::Delete, Scripted::Hang)
        .into_arc();
    let config = RouterConfig {
        attempt_timeout: Duration::from_millis(750),
        ..RouterConfig::default()
    };
    let h = harness(&[b1.clone(), b2], config);

    let stored = h
        .router
        .store(&record("z.webp", b"x"), deadline())
        .await
        .unwrap();

    let started = Instant::now();
    match h.router.delete(&stored.entry.file_key, deadline()).await {
        Err(AppError::PartialSuccess {
            failed, attempts, ..
        }) => {
            assert_eq!(failed, vec!["b2"]);
            assert_eq!(attempts[1].disposition, AttemptDisposition::Ambiguous);
            assert_eq!(attempts[1].error.as_deref(), Some("timeout"));
        }
        other => panic!("expected PartialSuccess, got {:?}", other),
    }
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(750) && waited < Duration::from_millis(760));
    // b2 may still serve the file, so the entry stays.
    assert!(h.catalog.lookup(&stored.entry.uuid).is_some());
}

#[tokio::test(start_paused = true)]
async fn delete_of_unknown_file_is_not_found_everywhere() {
    let b1 = ScriptedBackend::new("b1").into_arc();
    let b2 = ScriptedBackend::new("b2").into_arc();
    let mut h = harness(&[b1, b2], RouterConfig::default());

    let key = FileKey::new("CMS", "unique_name", "/ghost.jpg");
    assert!(matches!(
        h.router.delete(&key, deadline()).await,
        Err(AppError::NotFound { .. })
    ));
    assert!(h.signals.try_recv().is_err());
}

#[tokio::test]
async fn traversal_keys_are_rejected_before_any_backend_call() {
    let b1 = ScriptedBackend::new("b1").into_arc();
    let h = harness(&[b1.clone()], RouterConfig::default());

    assert!(matches!(
        h.router.store(&record("../etc/passwd", b"x"), deadline()).await,
        Err(AppError::InvalidInput(_))
    ));
    assert_eq!(b1.calls(Op::Put), 0);

    let escaping = FileKey::new("CMS", "unique_name", "/a/../../b.jpg");
    assert!(matches!(
        h.router.delete(&escaping, deadline()).await,
        Err(AppError::InvalidInput(_))
    ));
    assert_eq!(b1.calls(Op::Delete), 0);
}

#[tokio::test(start_paused = true)]
async fn same_name_in_two_namespaces_keeps_both_files() {
    let b1 = ScriptedBackend::new("b1").into_arc();
    let b2 = ScriptedBackend::new("b2").into_arc();
    let mut h = harness(&[b1.clone(), b2.clone()], RouterConfig::default());

    let cms = FileRecord::new("CMS", "unique_name", "/a.webp", b"AAAA".to_vec());
    let other = FileRecord::new("OTHER", "unique_name", "/a.webp", b"BBBB".to_vec());

    let first = h.router.store(&cms, deadline()).await.unwrap();
    let second = h.router.store(&other, deadline()).await.unwrap();

    assert_eq!(first.entry.backend, "b1");
    assert_eq!(second.entry.backend, "b2");
    assert_eq!(second.attempts[0].status_code, Some(409));
    assert_eq!(second.attempts[0].disposition, AttemptDisposition::FellThrough);
    assert_ne!(first.entry.public_url, second.entry.public_url);
    assert_eq!(h.catalog.len(), 2);

    let held = b1.store().get("/a.webp").await.unwrap();
    assert_eq!(held.body.as_deref(), Some(&b"AAAA"[..]));

    let report = h.router.delete(&cms.file_key(), deadline()).await.unwrap();
    assert_eq!(report.succeeded, vec!["b1"]);
    assert_eq!(report.absent, vec!["b2"]);
    assert_eq!(h.signals.try_recv().unwrap().backends, vec!["b1"]);

    assert_eq!(h.catalog.len(), 1);
    assert!(h.catalog.lookup(&second.entry.uuid).is_some());
    assert!(b2.store().contains("/a.webp"));
}

#[tokio::test(start_paused = true)]
async fn patch_on_all_failing_backends_is_unavailable() {
    let b1 = ScriptedBackend::new("b1")
        .always(Op::Patch, Scripted::Status(500))
        .into_arc();
    let b2 = ScriptedBackend::new("b2")
        .always(Op::Patch, Scripted::Unreachable)
        .into_arc();
    let file = FileRecord::new("CMS", "unique_name", "/x.jpg", vec![1u8]);
    seed(&b1, &file).await;
    seed(&b2, &file).await;
    let mut h = harness(&[b1.clone(), b2.clone()], RouterConfig::default());

    match h.router.patch(&file.file_key(), &expired(), deadline()).await {
        Err(AppError::BackendUnavailable {
            operation,
            attempts,
            ..
        }) => {
            assert_eq!(operation, "patch");
            assert_eq!(attempts.len(), 2);
            assert!(attempts
                .iter()
                .all(|a| a.disposition == AttemptDisposition::Failed));
        }
        other => panic!("expected BackendUnavailable, got {:?}", other),
    }

    assert_eq!(b1.calls(Op::Patch), 1);
    assert_eq!(b2.calls(Op::Patch), 1);
    assert!(h.signals.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn fan_out_deadline_still_signals_applied_backends() {
    let b1 = ScriptedBackend::new("b1").into_arc();
    let b2 = ScriptedBackend::new("b2")
        .always(Op::Patch, Scripted::Hang)
        .into_arc();
    let file = FileRecord::new("CMS", "unique_name", "/x.jpg", vec![1u8]);
    seed(&b1, &file).await;
    seed(&b2, &file).await;
    let mut h = harness(&[b1.clone(), b2.clone()], RouterConfig::default());

    let short = Instant::now() + Duration::from_millis(200);
    assert!(matches!(
        h.router.patch(&file.file_key(), &expired(), short).await,
        Err(AppError::DeadlineExceeded {
            operation: "patch",
            ..
        })
    ));

    assert_eq!(
        b1.store().metadata("/x.jpg").unwrap().get("expired").map(String::as_str),
        Some("true")
    );
    let signal = h.signals.try_recv().unwrap();
    assert_eq!(signal.operation, InvalidationOperation::Patch);
    assert_eq!(signal.backends, vec!["b1"]);
}
