use crate::keys;
use crate::traits::{AdapterResult, BackendAdapter, BackendError};
use async_trait::async_trait;
use mediagate_core::models::{Changes, FileKey};
use mediagate_core::{
    BackendConfig, BackendKind, BackendResult, FileRecord, StorageControlItem,
    StorageControlRequest,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};

/// Storage backend that delegates to a remote storage API over HTTP
///
/// Wire format of the remote API:
/// - `POST {api_url}`: multipart with `file`, `name`, `type`, `namespace`, `key_name`, `key_value`
/// - `GET {public_url}/{key}`: raw bytes
/// - `PATCH {api_url}`: `{ "data": [{ "st", "key_name", "key_value", "changes" }] }`
/// - `DELETE {api_url}`: `{ "data": [{ "st", "key_name", "key_value" }] }`
#[derive(Clone)]
pub struct HttpBackend {
    id: String,
    client: Client,
    api_url: String,
    public_base_url: String,
    idempotent_writes: bool,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let api_url = config.api_url.clone().ok_or_else(|| {
            BackendError::ConfigError(format!("API URL not configured for backend {}", config.id))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                BackendError::ConfigError(format!("Failed to build HTTP client: {}", e))
            })?;

        tracing::info!(
            backend = %config.id,
            api_url = %api_url,
            public_url = %config.public_url,
            timeout_ms = config.timeout.as_millis() as u64,
            "HTTP storage backend initialized"
        );

        Ok(Self {
            id: config.id.clone(),
            client,
            api_url,
            public_base_url: config.public_url.clone(),
            idempotent_writes: config.idempotent_writes,
        })
    }

    /// Classify a client error by whether the request may have been applied
    fn classify(&self, err: reqwest::Error) -> BackendError {
        if err.is_builder() {
            BackendError::ConfigError(err.to_string())
        } else if err.is_connect() {
            BackendError::Unreachable(err.to_string())
        } else if err.is_timeout() {
            BackendError::Timeout(err.to_string())
        } else {
            BackendError::Interrupted(err.to_string())
        }
    }

    /// Translate a native reply into the uniform result shape
    async fn into_result(&self, response: Response) -> AdapterResult {
        let status_code = response.status().as_u16();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        let mut result = BackendResult::new(status_code);
        if is_json {
            if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&body) {
                result = result.with_structured(value);
            }
        }
        if !body.is_empty() {
            result = result.with_body(body);
        }
        Ok(result)
    }

    fn control_body(key: &FileKey, changes: Option<&Changes>) -> StorageControlRequest {
        StorageControlRequest {
            data: vec![StorageControlItem {
                st: key.namespace.clone(),
                key_name: key.key_name.clone(),
                key_value: key.key_value.clone(),
                changes: changes.cloned(),
            }],
        }
    }
}

#[async_trait]
impl BackendAdapter for HttpBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Http
    }

    fn idempotent_writes(&self) -> bool {
        self.idempotent_writes
    }

    fn public_url(&self, storage_key: &str) -> String {
        keys::public_url(&self.public_base_url, storage_key)
    }

    async fn put(&self, record: &FileRecord) -> AdapterResult {
        keys::validate_key_value(&record.key_value)?;

        let content_type = record
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let part = Part::bytes(record.payload.to_vec())
            .file_name(record.file_name().to_string())
            .mime_str(&content_type)
            .map_err(|e| BackendError::ConfigError(format!("Invalid content type: {}", e)))?;

        let mut form = Form::new()
            .part("file", part)
            .text("name", record.file_name().to_string())
            .text("type", content_type)
            .text("namespace", record.storage_type.clone())
            .text("key_name", record.key_name.clone())
            .text("key_value", record.key_value.clone());
        for (name, value) in &record.metadata {
            form = form.text(format!("metadata[{}]", name), value.clone());
        }

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        tracing::debug!(
            backend = %self.id,
            key_value = %record.key_value,
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "HTTP backend upload answered"
        );

        self.into_result(response).await
    }

    async fn get(&self, key_value: &str) -> AdapterResult {
        keys::validate_key_value(key_value)?;
        let url = self.public_url(&keys::storage_key(key_value));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        self.into_result(response).await
    }

    async fn patch(&self, key: &FileKey, changes: &Changes) -> AdapterResult {
        let response = self
            .client
            .patch(&self.api_url)
            .json(&Self::control_body(key, Some(changes)))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        self.into_result(response).await
    }

    async fn delete(&self, key: &FileKey) -> AdapterResult {
        let response = self
            .client
            .delete(&self.api_url)
            .json(&Self::control_body(key, None))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        self.into_result(response).await
    }
}
