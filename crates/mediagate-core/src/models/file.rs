use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Changes applied to a stored file by a patch, e.g. `{"expired": "true"}`.
pub type Changes = BTreeMap<String, String>;

/// Backend-agnostic identity of a logical file.
///
/// `(namespace, key_name, key_value)` is unique within one deployment and is
/// stable across backend migrations; backends may store the object under a
/// different native key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey {
    pub namespace: String,
    pub key_name: String,
    pub key_value: String,
}

impl FileKey {
    pub fn new(
        namespace: impl Into<String>,
        key_name: impl Into<String>,
        key_value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            key_name: key_name.into(),
            key_value: key_value.into(),
        }
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}={}", self.namespace, self.key_name, self.key_value)
    }
}

/// A file-level write handed to the router.
///
/// Transient: lives for one operation only.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Namespace the file belongs to (`st` on the storage-control API)
    pub storage_type: String,
    pub key_name: String,
    /// Caller-facing identity, e.g. a logical path like `/a.webp`
    pub key_value: String,
    pub payload: Bytes,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl FileRecord {
    pub fn new(
        storage_type: impl Into<String>,
        key_name: impl Into<String>,
        key_value: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            storage_type: storage_type.into(),
            key_name: key_name.into(),
            key_value: key_value.into(),
            payload: payload.into(),
            content_type: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn file_key(&self) -> FileKey {
        FileKey::new(&self.storage_type, &self.key_name, &self.key_value)
    }

    /// Last path segment of `key_value`, used as the upload file name.
    pub fn file_name(&self) -> &str {
        self.key_value
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(self.key_value.as_str())
    }
}
