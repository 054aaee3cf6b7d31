//! Route configuration and setup.
//!
//! Health checks live in [health](health).

mod health;

use crate::handlers::{
    catalog::{get_catalog_entry, list_catalog},
    file_upload::upload_file,
    public_file::get_public_file,
    storage_control::{delete_storage, patch_storage},
};
use crate::middleware::{rate_limit_middleware, request_id_middleware};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
///
/// Every route passes the path-keyed rate limiter; only `POST /file` accepts
/// bodies up to the configured upload size.
pub fn setup_routes(state: Arc<AppState>) -> Router {
    let max_upload_size = state.config.server.max_upload_size_bytes;

    let upload_routes = Router::new()
        .route("/file", post(upload_file))
        .layer(RequestBodyLimitLayer::new(max_upload_size))
        .layer(DefaultBodyLimit::max(max_upload_size));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/files/{*key}", get(get_public_file))
        .route("/storage", patch(patch_storage).delete(delete_storage))
        .route("/catalog", get(list_catalog))
        .route("/catalog/{uuid}", get(get_catalog_entry))
        .merge(upload_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(setup_cors()),
        )
        .with_state(state)
}

/// Files are public; any origin may read them and call the storage API.
fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}
