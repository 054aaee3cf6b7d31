use serde::{Deserialize, Serialize};

use super::{Changes, FileKey};

/// Body of `PATCH` / `DELETE` on the storage-control API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageControlRequest {
    pub data: Vec<StorageControlItem>,
}

/// One addressed file in a storage-control batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageControlItem {
    /// Namespace (storage type)
    pub st: String,
    pub key_name: String,
    pub key_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Changes>,
}

impl StorageControlItem {
    pub fn file_key(&self) -> FileKey {
        FileKey::new(&self.st, &self.key_name, &self.key_value)
    }
}
