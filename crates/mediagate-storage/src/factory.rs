#[cfg(feature = "storage-http")]
use crate::HttpBackend;
#[cfg(feature = "storage-memory")]
use crate::MemoryBackend;
use crate::{BackendAdapter, BackendError, BackendKind};
use mediagate_core::{BackendConfig, Config};
use std::sync::Arc;

/// Create the configured backends, in priority order
pub fn create_backends(config: &Config) -> Result<Vec<Arc<dyn BackendAdapter>>, BackendError> {
    if config.backends.is_empty() {
        return Err(BackendError::ConfigError(
            "STORAGE_BACKENDS must name at least one backend".to_string(),
        ));
    }

    config.backends.iter().map(create_backend).collect()
}

/// Create one backend, dispatching on its configured kind
pub fn create_backend(backend: &BackendConfig) -> Result<Arc<dyn BackendAdapter>, BackendError> {
    match backend.kind {
        #[cfg(feature = "storage-http")]
        BackendKind::Http => Ok(Arc::new(HttpBackend::new(backend)?)),

        #[cfg(not(feature = "storage-http"))]
        BackendKind::Http => Err(BackendError::ConfigError(
            "HTTP storage backend not available (storage-http feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        BackendKind::Memory => Ok(Arc::new(MemoryBackend::new(
            backend.id.clone(),
            backend.public_url.clone(),
        ))),

        #[cfg(not(feature = "storage-memory"))]
        BackendKind::Memory => Err(BackendError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)".to_string(),
        )),
    }
}
