use crate::keys;
use crate::traits::{AdapterResult, BackendAdapter};
use async_trait::async_trait;
use bytes::Bytes;
use mediagate_core::models::{Changes, FileKey};
use mediagate_core::{BackendKind, BackendResult, FileRecord};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone)]
struct StoredObject {
    namespace: String,
    key_name: String,
    payload: Bytes,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
}

/// In-process storage backend
///
/// Objects live in a map keyed by storage key. `put` overwrites an object of
/// the same file, so it is safe to repeat, and answers 409 when the key is held
/// by a file of another namespace or key name.
pub struct MemoryBackend {
    id: String,
    public_base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryBackend {
    /// Create a new MemoryBackend
    ///
    /// # Arguments
    /// * `id` - Backend id in the priority list (e.g., "memory")
    /// * `public_base_url` - Base URL for serving files (e.g., "http://localhost:4000/files")
    pub fn new(id: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            public_base_url: public_base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn contains(&self, key_value: &str) -> bool {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&keys::storage_key(key_value))
    }

    /// Stored metadata of an object, including applied patches
    pub fn metadata(&self, key_value: &str) -> Option<HashMap<String, String>> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&keys::storage_key(key_value))
            .map(|object| object.metadata.clone())
    }

    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn owns(object: &StoredObject, key: &FileKey) -> bool {
        object.namespace == key.namespace && object.key_name == key.key_name
    }
}

#[async_trait]
impl BackendAdapter for MemoryBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn idempotent_writes(&self) -> bool {
        true
    }

    fn public_url(&self, storage_key: &str) -> String {
        keys::public_url(&self.public_base_url, storage_key)
    }

    async fn put(&self, record: &FileRecord) -> AdapterResult {
        if let Err(e) = keys::validate_key_value(&record.key_value) {
            return Ok(BackendResult::new(400).with_structured(json!({ "error": e.to_string() })));
        }

        let key = keys::storage_key(&record.key_value);
        let size = record.payload.len();
        let object = StoredObject {
            namespace: record.storage_type.clone(),
            key_name: record.key_name.clone(),
            payload: record.payload.clone(),
            content_type: record.content_type.clone(),
            metadata: record.metadata.clone(),
        };

        {
            let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(held) = objects.get(&key) {
                if !Self::owns(held, &record.file_key()) {
                    tracing::debug!(
                        backend = %self.id,
                        key = %key,
                        held_namespace = %held.namespace,
                        "Memory backend refused store over another file"
                    );
                    return Ok(BackendResult::new(409).with_structured(json!({
                        "error": format!("Storage key '{}' belongs to another file", key),
                    })));
                }
            }
            objects.insert(key.clone(), object);
        }

        tracing::debug!(
            backend = %self.id,
            key = %key,
            size_bytes = size,
            "Memory backend stored object"
        );

        Ok(BackendResult::new(201).with_structured(json!({
            "key": key,
            "url": self.public_url(&key),
            "size": size,
        })))
    }

    async fn get(&self, key_value: &str) -> AdapterResult {
        let key = keys::storage_key(key_value);
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);

        match objects.get(&key) {
            Some(object) => Ok(BackendResult::new(200)
                .with_body(object.payload.clone())
                .with_structured(json!({
                    "key": key,
                    "content_type": object.content_type,
                    "metadata": object.metadata,
                }))),
            None => Ok(BackendResult::new(404)),
        }
    }

    async fn patch(&self, key: &FileKey, changes: &Changes) -> AdapterResult {
        let storage_key = keys::storage_key(&key.key_value);
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);

        match objects.get_mut(&storage_key) {
            Some(object) if Self::owns(object, key) => {
                for (name, value) in changes {
                    object.metadata.insert(name.clone(), value.clone());
                }
                Ok(BackendResult::new(200).with_structured(json!({
                    "key": storage_key,
                    "metadata": object.metadata,
                })))
            }
            _ => Ok(BackendResult::new(404)),
        }
    }

    async fn delete(&self, key: &FileKey) -> AdapterResult {
        let storage_key = keys::storage_key(&key.key_value);
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);

        let owned = objects
            .get(&storage_key)
            .is_some_and(|object| Self::owns(object, key));
        if !owned {
            return Ok(BackendResult::new(404));
        }

        objects.remove(&storage_key);
        Ok(BackendResult::new(200).with_structured(json!({ "key": storage_key })))
    }
}
