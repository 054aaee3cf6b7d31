//! Public file route: serves stored bytes from the first backend that holds them.

use crate::constants::PUBLIC_CACHE_CONTROL;
use crate::error::HttpAppError;
use crate::handlers::requested_timeout;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use mediagate_core::AppError;
use std::sync::Arc;

#[tracing::instrument(skip(state, headers), fields(operation = "get_public_file"))]
pub async fn get_public_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let timeout = requested_timeout(&headers)?;
    let outcome = state.gateway.fetch(&format!("/{}", key), timeout).await?;

    let content_type = outcome
        .result
        .structured_str("content_type")
        .unwrap_or("application/octet-stream")
        .to_string();
    let body = outcome.result.body.unwrap_or_default();

    tracing::debug!(
        backend = %outcome.backend,
        size_bytes = body.len(),
        "Serving public file"
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, PUBLIC_CACHE_CONTROL)
        .body(Body::from(body))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}
