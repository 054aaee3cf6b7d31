//! Test app construction for HTTP integration tests.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use mediagate_api::setup::{build_state, routes::setup_routes};
use mediagate_api::AppState;
use mediagate_core::Config;
use mediagate_storage::{BackendAdapter, MemoryBackend};
use std::collections::HashMap;
use std::sync::Arc;

pub const PUBLIC_BASE: &str = "http://localhost:4000/files";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Configuration from explicit pairs; nothing is read from the environment.
pub fn test_config(pairs: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned()).expect("Invalid test configuration")
}

/// App backed by a single in-memory backend.
pub fn setup_test_app(pairs: &[(&str, &str)]) -> TestApp {
    let backend: Arc<dyn BackendAdapter> = Arc::new(MemoryBackend::new("memory", PUBLIC_BASE));
    setup_test_app_with_backends(pairs, vec![backend])
}

/// App over an explicit backend priority list.
pub fn setup_test_app_with_backends(
    pairs: &[(&str, &str)],
    backends: Vec<Arc<dyn BackendAdapter>>,
) -> TestApp {
    let state = build_state(test_config(pairs), backends).expect("Failed to build app state");
    let app = setup_routes(state.clone());
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp { server, state }
}

pub fn upload_form(name: &str, content_type: &str, data: &[u8]) -> MultipartForm {
    let part = Part::bytes(data.to_vec())
        .file_name(name.to_string())
        .mime_type(content_type.to_string());
    MultipartForm::new()
        .add_part("file", part)
        .add_text("name", name.to_string())
        .add_text("type", content_type.to_string())
        .add_text("namespace", "CMS")
}

pub async fn upload(client: &TestServer, name: &str, data: &[u8]) -> TestResponse {
    client
        .post("/file")
        .multipart(upload_form(name, "image/webp", data))
        .await
}

pub fn control_body(key_value: &str, changes: Option<serde_json::Value>) -> serde_json::Value {
    let mut item = serde_json::json!({
        "st": "CMS",
        "key_name": "unique_name",
        "key_value": key_value,
    });
    if let Some(changes) = changes {
        item["changes"] = changes;
    }
    serde_json::json!({ "data": [item] })
}
