use serde::{Deserialize, Serialize};

/// What the router did after one backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptDisposition {
    /// The call succeeded and ended the operation (or this fan-out target)
    Succeeded,
    /// Failed with a retryable error; the same backend was tried again
    Retried,
    /// Gave up on this backend and moved to the next in priority order
    FellThrough,
    /// Fan-out target reported the object absent
    Absent,
    /// Fan-out target failed
    Failed,
    /// The call may or may not have been applied
    Ambiguous,
}

/// Diagnostic record of a single backend call made by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendAttempt {
    pub backend: String,
    /// 1-based attempt number against this backend
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub disposition: AttemptDisposition,
    pub duration_ms: u64,
}

impl BackendAttempt {
    pub fn status(
        backend: &str,
        attempt: u32,
        status_code: u16,
        disposition: AttemptDisposition,
        duration_ms: u64,
    ) -> Self {
        Self {
            backend: backend.to_string(),
            attempt,
            status_code: Some(status_code),
            error: None,
            disposition,
            duration_ms,
        }
    }

    pub fn error(
        backend: &str,
        attempt: u32,
        error: impl Into<String>,
        disposition: AttemptDisposition,
        duration_ms: u64,
    ) -> Self {
        Self {
            backend: backend.to_string(),
            attempt,
            status_code: None,
            error: Some(error.into()),
            disposition,
            duration_ms,
        }
    }

    /// Short form used in error messages: `b1#2=500` or `b1#1=timeout`.
    pub fn summary(&self) -> String {
        match (self.status_code, &self.error) {
            (Some(code), _) => format!("{}#{}={}", self.backend, self.attempt, code),
            (None, Some(err)) => format!("{}#{}={}", self.backend, self.attempt, err),
            (None, None) => format!("{}#{}", self.backend, self.attempt),
        }
    }
}

/// Join attempt summaries for display.
pub(crate) fn summarize(attempts: &[BackendAttempt]) -> String {
    attempts
        .iter()
        .map(BackendAttempt::summary)
        .collect::<Vec<_>>()
        .join(", ")
}
