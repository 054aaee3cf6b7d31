//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod storage;

use crate::constants::SERVICE_NAME;
use crate::state::AppState;
use anyhow::Result;
use mediagate_core::Config;
use mediagate_infra::RateLimiter;
use mediagate_storage::BackendAdapter;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    mediagate_infra::init_telemetry(
        &config.server.log_format,
        SERVICE_NAME,
        &config.server.environment,
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let backends = storage::setup_backends(&config)?;
    let state = build_state(config, backends)?;

    let _sweeper = state.rate_limiter.spawn_sweeper();
    tracing::info!(
        window_ms = state.rate_limiter.window_size().as_millis() as u64,
        default_limit = state.config.rate_limit.default_limit,
        "Rate limiting enabled per route with automatic window cleanup"
    );

    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}

/// Assemble the shared state around an explicit backend list.
pub fn build_state(
    config: Config,
    backends: Vec<Arc<dyn BackendAdapter>>,
) -> Result<Arc<AppState>> {
    crate::error::hide_error_details(config.is_production());

    let (gateway, invalidations) = storage::setup_gateway(&config, backends)?;
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        gateway,
        rate_limiter,
        invalidations,
    }))
}
