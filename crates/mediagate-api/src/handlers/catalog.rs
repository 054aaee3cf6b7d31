use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use mediagate_core::{AppError, CatalogEntry};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct CatalogListItem {
    pub uuid: Uuid,
    pub public_url: String,
}

/// List stored files in first-store order.
#[tracing::instrument(skip(state), fields(operation = "list_catalog"))]
pub async fn list_catalog(State(state): State<Arc<AppState>>) -> Json<Vec<CatalogListItem>> {
    let items = state
        .gateway
        .catalog()
        .list()
        .into_iter()
        .map(|entry| CatalogListItem {
            uuid: entry.uuid,
            public_url: entry.public_url.clone(),
        })
        .collect();

    Json(items)
}

#[tracing::instrument(skip(state), fields(operation = "get_catalog_entry"))]
pub async fn get_catalog_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CatalogEntry>, HttpAppError> {
    // An id that is not a uuid names no entry.
    let entry = Uuid::parse_str(&id)
        .ok()
        .and_then(|uuid| state.gateway.catalog().lookup(&uuid))
        .ok_or_else(|| AppError::not_found(format!("No catalog entry {}", id)))?;

    Ok(Json(entry.as_ref().clone()))
}
