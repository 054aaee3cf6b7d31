use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Changes, FileKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationOperation {
    Patch,
    Delete,
}

/// Emitted after a patch or delete reached at least one backend.
///
/// Carries everything a CDN purger needs: the logical key, the backends that
/// applied the change, and the public URLs that may now be stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationSignal {
    pub operation: InvalidationOperation,
    pub file_key: FileKey,
    pub backends: Vec<String>,
    pub public_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Changes>,
    pub emitted_at: DateTime<Utc>,
}
