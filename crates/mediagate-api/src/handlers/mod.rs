pub mod catalog;
pub mod file_upload;
pub mod public_file;
pub mod storage_control;

use std::time::Duration;

use axum::http::HeaderMap;
use mediagate_core::AppError;

use crate::constants::REQUEST_TIMEOUT_HEADER;

/// Deadline requested through `X-Request-Timeout-Ms`, if any.
///
/// The gateway clamps it to the configured operation deadline.
pub(crate) fn requested_timeout(headers: &HeaderMap) -> Result<Option<Duration>, AppError> {
    let Some(value) = headers.get(REQUEST_TIMEOUT_HEADER) else {
        return Ok(None);
    };

    let millis: u64 = value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|ms| *ms > 0)
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "{} must be a positive number of milliseconds",
                REQUEST_TIMEOUT_HEADER
            ))
        })?;

    Ok(Some(Duration::from_millis(millis)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_timeout_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(requested_timeout(&headers).unwrap(), None);

        headers.insert(REQUEST_TIMEOUT_HEADER, HeaderValue::from_static("250"));
        assert_eq!(
            requested_timeout(&headers).unwrap(),
            Some(Duration::from_millis(250))
        );

        headers.insert(REQUEST_TIMEOUT_HEADER, HeaderValue::from_static("0"));
        assert!(matches!(
            requested_timeout(&headers),
            Err(AppError::InvalidInput(_))
        ));
    }
}
