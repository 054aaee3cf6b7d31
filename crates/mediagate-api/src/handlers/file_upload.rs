//! `POST /file`: multipart upload through the upload queue and the router.

use crate::error::HttpAppError;
use crate::handlers::requested_timeout;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use mediagate_core::constants::DEFAULT_KEY_NAME;
use mediagate_core::{AppError, FileRecord};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub uuid: Uuid,
    pub url: String,
    /// Key under which the backend holds the file
    pub key: String,
    pub backend: String,
}

#[derive(Debug, Default)]
struct UploadForm {
    payload: Option<Bytes>,
    part_file_name: Option<String>,
    part_content_type: Option<String>,
    name: Option<String>,
    content_type: Option<String>,
    namespace: Option<String>,
}

/// Read the upload form. Only one field named "file" is accepted.
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "file" => {
                if form.payload.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                form.part_file_name = field.file_name().map(|s| s.to_string());
                form.part_content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;
                form.payload = Some(data);
            }
            "name" | "type" | "namespace" => {
                let value = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read field '{}': {}", field_name, e))
                })?;
                let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                match field_name.as_str() {
                    "name" => form.name = value,
                    "type" => form.content_type = value,
                    _ => form.namespace = value,
                }
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

impl UploadForm {
    fn into_record(self) -> Result<FileRecord, AppError> {
        let payload = self
            .payload
            .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
        if payload.is_empty() {
            return Err(AppError::InvalidInput("File is empty".to_string()));
        }

        let namespace = self
            .namespace
            .ok_or_else(|| AppError::InvalidInput("Field 'namespace' is required".to_string()))?;
        let name = self
            .name
            .or(self.part_file_name)
            .ok_or_else(|| AppError::InvalidInput("Field 'name' is required".to_string()))?;
        let content_type = self
            .content_type
            .or(self.part_content_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let key_value = format!("/{}", name.trim_start_matches('/'));
        Ok(FileRecord::new(namespace, DEFAULT_KEY_NAME, key_value, payload)
            .with_content_type(content_type))
    }
}

/// Store an uploaded file on the first backend that accepts it.
#[tracing::instrument(skip(state, headers, multipart), fields(operation = "upload_file"))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let timeout = requested_timeout(&headers)?;
    let record = read_form(multipart).await?.into_record()?;

    tracing::debug!(
        namespace = %record.storage_type,
        key_value = %record.key_value,
        size_bytes = record.payload.len(),
        "Upload received"
    );

    let outcome = state.gateway.store(record, timeout).await?;
    let entry = outcome.entry;

    tracing::debug!(
        uuid = %entry.uuid,
        attempts = outcome.attempts.len(),
        "Upload completed"
    );

    Ok(Json(UploadResponse {
        uuid: entry.uuid,
        url: entry.public_url.clone(),
        key: entry.backend_key.clone(),
        backend: entry.backend.clone(),
    }))
}
