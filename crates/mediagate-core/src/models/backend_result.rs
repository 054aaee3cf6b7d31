use bytes::Bytes;

/// Uniform reply of every backend adapter call.
///
/// Adapters translate their native responses into this shape so the router
/// never hands a backend-specific type to its callers.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResult {
    pub status_code: u16,
    pub body: Option<Bytes>,
    pub structured: Option<serde_json::Value>,
}

impl BackendResult {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            body: None,
            structured: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_structured(mut self, structured: serde_json::Value) -> Self {
        self.structured = Some(structured);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code >= 500
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == 404 || self.status_code == 410
    }

    /// Read a string field from the structured reply, if any.
    pub fn structured_str(&self, field: &str) -> Option<&str> {
        self.structured
            .as_ref()
            .and_then(|value| value.get(field))
            .and_then(|value| value.as_str())
    }
}
