mod helpers;

use helpers::{setup_test_app, setup_test_app_with_backends, upload};
use mediagate_storage::test_helpers::ScriptedBackend;
use mediagate_storage::BackendAdapter;
use std::sync::Arc;

#[tokio::test]
async fn test_health_reports_backends_and_queue() {
    let b1 = ScriptedBackend::new("primary").into_arc();
    let b2 = ScriptedBackend::new("backup").into_arc();
    let app = setup_test_app_with_backends(
        &[("UPLOAD_QUEUE_CAPACITY", "3")],
        vec![b1 as Arc<dyn BackendAdapter>, b2 as Arc<dyn BackendAdapter>],
    );

    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "mediagate");
    assert_eq!(body["backends"], serde_json::json!(["primary", "backup"]));
    assert_eq!(body["upload_queue"]["capacity"], 3);
    assert_eq!(body["upload_queue"]["in_flight"], 0);
    assert_eq!(body["catalog_entries"], 0);
}

#[tokio::test]
async fn test_health_counts_catalog_and_admissions() {
    let app = setup_test_app(&[]);
    let client = app.client();

    upload(client, "a.webp", b"RIFF").await.assert_status_ok();
    upload(client, "b.webp", b"RIFF").await.assert_status_ok();

    let body: serde_json::Value = client.get("/health").await.json();
    assert_eq!(body["catalog_entries"], 2);
    assert_eq!(body["upload_queue"]["admitted"], 2);
    assert_eq!(body["upload_queue"]["peak_in_flight"], 1);
}

#[tokio::test]
async fn test_request_id_is_generated_and_echoed() {
    let app = setup_test_app(&[]);
    let client = app.client();

    let response = client.get("/health").await;
    let generated = response.header("x-request-id");
    assert!(!generated.is_empty());

    let response = client
        .get("/health")
        .add_header("x-request-id", "trace-1234")
        .await;
    assert_eq!(response.header("x-request-id"), "trace-1234");
}
