//! `PATCH /storage` and `DELETE /storage`: batched fan-out operations.
//!
//! Every item of a batch is routed independently. The batch answers 200 when
//! every item fully succeeded and 207 for a mix of outcomes. A batch of one
//! failing item answers with that item's own error, and a batch whose items all
//! failed with one status answers with that status.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::requested_timeout;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::join_all;
use mediagate_core::{
    AppError, BackendAttempt, ErrorMetadata, StorageControlItem, StorageControlRequest,
};
use mediagate_router::FanoutReport;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlOperation {
    Patch,
    Delete,
}

impl ControlOperation {
    fn as_str(self) -> &'static str {
        match self {
            ControlOperation::Patch => "patch",
            ControlOperation::Delete => "delete",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemResult {
    pub st: String,
    pub key_name: String,
    pub key_value: String,
    pub status: u16,
    pub succeeded: Vec<String>,
    pub absent: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
    pub attempts: Vec<BackendAttempt>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub operation: &'static str,
    pub results: Vec<ItemResult>,
}

impl ItemResult {
    fn applied(item: &StorageControlItem, report: FanoutReport) -> Self {
        Self {
            st: item.st.clone(),
            key_name: item.key_name.clone(),
            key_value: item.key_value.clone(),
            status: StatusCode::OK.as_u16(),
            succeeded: report.succeeded,
            absent: report.absent,
            failed: Vec::new(),
            error: None,
            attempts: report.attempts,
        }
    }

    fn failed(item: &StorageControlItem, err: &AppError) -> Self {
        let (succeeded, failed) = match err {
            AppError::PartialSuccess {
                succeeded, failed, ..
            } => (succeeded.clone(), failed.clone()),
            _ => (Vec::new(), Vec::new()),
        };
        let error = ErrorResponse::from_app_error(err);

        Self {
            st: item.st.clone(),
            key_name: item.key_name.clone(),
            key_value: item.key_value.clone(),
            status: err.http_status_code(),
            succeeded,
            absent: Vec::new(),
            failed,
            error: Some(error),
            attempts: err.attempts().to_vec(),
        }
    }
}

fn validate_batch(
    operation: ControlOperation,
    request: &StorageControlRequest,
) -> Result<(), AppError> {
    if request.data.is_empty() {
        return Err(AppError::InvalidInput(
            "Field 'data' must list at least one file".to_string(),
        ));
    }

    if operation == ControlOperation::Patch {
        if let Some(position) = request
            .data
            .iter()
            .position(|item| !item.changes.as_ref().is_some_and(|c| !c.is_empty()))
        {
            return Err(AppError::InvalidInput(format!(
                "Item {} of 'data' has no changes to apply",
                position
            )));
        }
    }

    Ok(())
}

async fn run_item(
    state: &AppState,
    operation: ControlOperation,
    item: &StorageControlItem,
    timeout: Option<Duration>,
) -> Result<FanoutReport, AppError> {
    let key = item.file_key();
    match (operation, item.changes.as_ref()) {
        (ControlOperation::Patch, Some(changes)) => {
            state.gateway.patch(&key, changes, timeout).await
        }
        (ControlOperation::Patch, None) => Err(AppError::InvalidInput(format!(
            "No changes given for {}",
            key
        ))),
        (ControlOperation::Delete, _) => state.gateway.delete(&key, timeout).await,
    }
}

async fn run_batch(
    state: Arc<AppState>,
    operation: ControlOperation,
    headers: HeaderMap,
    request: StorageControlRequest,
) -> Result<Response, HttpAppError> {
    let timeout = requested_timeout(&headers)?;
    validate_batch(operation, &request)?;

    let outcomes = join_all(
        request
            .data
            .iter()
            .map(|item| run_item(&state, operation, item, timeout)),
    )
    .await;

    let failures = outcomes.iter().filter(|o| o.is_err()).count();
    tracing::info!(
        operation = operation.as_str(),
        items = request.data.len(),
        failures,
        "Storage control batch finished"
    );

    let single = request.data.len() == 1;
    let mut results = Vec::with_capacity(request.data.len());
    for (item, outcome) in request.data.iter().zip(outcomes) {
        match outcome {
            Ok(report) => results.push(ItemResult::applied(item, report)),
            Err(err) if single => return Err(HttpAppError(err)),
            Err(err) => results.push(ItemResult::failed(item, &err)),
        }
    }

    let status = batch_status(&results);

    Ok((
        status,
        Json(BatchResponse {
            operation: operation.as_str(),
            results,
        }),
    )
        .into_response())
}

/// 200 when every item succeeded. When every item failed the same way the batch
/// takes that status; any other mix is 207.
fn batch_status(results: &[ItemResult]) -> StatusCode {
    match results.first() {
        Some(first) if results.iter().all(|r| r.status == first.status) => {
            StatusCode::from_u16(first.status).unwrap_or(StatusCode::MULTI_STATUS)
        }
        Some(_) => StatusCode::MULTI_STATUS,
        None => StatusCode::OK,
    }
}

/// Apply changes (e.g. `{"expired": "true"}`) on every backend holding each file.
#[tracing::instrument(skip(state, headers, request), fields(operation = "patch_storage"))]
pub async fn patch_storage(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<StorageControlRequest>,
) -> Result<Response, HttpAppError> {
    run_batch(state, ControlOperation::Patch, headers, request).await
}

/// Delete each file from every backend holding it.
#[tracing::instrument(skip(state, headers, request), fields(operation = "delete_storage"))]
pub async fn delete_storage(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<StorageControlRequest>,
) -> Result<Response, HttpAppError> {
    run_batch(state, ControlOperation::Delete, headers, request).await
}
