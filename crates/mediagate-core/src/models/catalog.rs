use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FileKey;

/// Catalog row mapping an opaque identifier to a public URL.
///
/// Created on the first successful store of a file, updated when a re-upload
/// lands under a different backend key, removed on a complete delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub uuid: Uuid,
    pub public_url: String,
    /// Key under which the backend holds the object
    pub backend_key: String,
    /// Id of the backend that accepted the latest store
    pub backend: String,
    pub file_key: FileKey,
    /// Position in first-store order
    #[serde(skip)]
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
