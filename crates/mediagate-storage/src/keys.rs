//! Shared key handling for storage backends.

use crate::traits::BackendError;

/// Backend-resident key for a logical `key_value`: the path without leading slashes.
pub fn storage_key(key_value: &str) -> String {
    key_value.trim_start_matches('/').to_string()
}

/// Reject keys that are empty or could escape a backend's namespace.
pub fn validate_key_value(key_value: &str) -> Result<(), BackendError> {
    let key = storage_key(key_value);
    if key.is_empty() {
        return Err(BackendError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.split('/').any(|segment| segment == "..") {
        return Err(BackendError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Public URL of a stored object: `{base}/{key}` with each segment percent-encoded.
pub fn public_url(base_url: &str, storage_key: &str) -> String {
    let encoded: Vec<String> = storage_key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", base_url.trim_end_matches('/'), encoded.join("/"))
}
