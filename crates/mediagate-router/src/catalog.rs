//! Catalog Index
//!
//! Maps an opaque uuid to the public URL and backend-resident key of a stored
//! file. The index is an immutable snapshot behind an `ArcSwap`: readers load
//! the current snapshot without locking and always see a complete entry, while
//! writers serialize on a mutex, copy the snapshot, and publish the new one.
//!
//! Every write copies both maps, so a write costs O(entries). A large catalog
//! under bursty uploads needs a persistent map or per-shard snapshots instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use chrono::Utc;
use uuid::Uuid;

use mediagate_core::{CatalogEntry, FileKey};

#[derive(Debug, Default, Clone)]
struct Snapshot {
    by_uuid: HashMap<Uuid, Arc<CatalogEntry>>,
    by_key: HashMap<FileKey, Uuid>,
    next_seq: u64,
}

impl Snapshot {
    fn insert(&mut self, entry: CatalogEntry) -> Arc<CatalogEntry> {
        if let Some(previous) = self.by_uuid.get(&entry.uuid) {
            if previous.file_key != entry.file_key {
                self.by_key.remove(&previous.file_key);
            }
        }
        self.by_key.insert(entry.file_key.clone(), entry.uuid);
        let entry = Arc::new(entry);
        self.by_uuid.insert(entry.uuid, entry.clone());
        entry
    }

    fn remove(&mut self, uuid: &Uuid) -> Option<Arc<CatalogEntry>> {
        let entry = self.by_uuid.remove(uuid)?;
        self.by_key.remove(&entry.file_key);
        Some(entry)
    }
}

pub struct CatalogIndex {
    current: ArcSwap<Snapshot>,
    writer: Mutex<()>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            writer: Mutex::new(()),
        }
    }

    fn update<R>(&self, apply: impl FnOnce(&mut Snapshot) -> R) -> R {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = Snapshot::clone(&self.current.load());
        let result = apply(&mut next);
        self.current.store(Arc::new(next));
        result
    }

    pub fn lookup(&self, uuid: &Uuid) -> Option<Arc<CatalogEntry>> {
        self.current.load().by_uuid.get(uuid).cloned()
    }

    pub fn lookup_key(&self, key: &FileKey) -> Option<Arc<CatalogEntry>> {
        let snapshot = self.current.load();
        snapshot
            .by_key
            .get(key)
            .and_then(|uuid| snapshot.by_uuid.get(uuid))
            .cloned()
    }

    /// Insert or replace an entry by uuid.
    pub fn upsert(&self, entry: CatalogEntry) -> Arc<CatalogEntry> {
        self.update(|snapshot| snapshot.insert(entry))
    }

    /// Record a successful store of `key`.
    ///
    /// A first store creates an entry with a fresh uuid. A re-upload keeps the
    /// uuid and list position and updates the backend key, URL and backend.
    pub fn record_store(
        &self,
        key: &FileKey,
        backend: &str,
        backend_key: &str,
        public_url: &str,
    ) -> Arc<CatalogEntry> {
        self.update(|snapshot| {
            let now = Utc::now();
            let existing = snapshot
                .by_key
                .get(key)
                .and_then(|uuid| snapshot.by_uuid.get(uuid))
                .cloned();

            let entry = match existing {
                Some(existing) => CatalogEntry {
                    public_url: public_url.to_string(),
                    backend_key: backend_key.to_string(),
                    backend: backend.to_string(),
                    updated_at: now,
                    ..CatalogEntry::clone(&existing)
                },
                None => {
                    let seq = snapshot.next_seq;
                    snapshot.next_seq += 1;
                    CatalogEntry {
                        uuid: Uuid::new_v4(),
                        public_url: public_url.to_string(),
                        backend_key: backend_key.to_string(),
                        backend: backend.to_string(),
                        file_key: key.clone(),
                        seq,
                        created_at: now,
                        updated_at: now,
                    }
                }
            };
            snapshot.insert(entry)
        })
    }

    pub fn remove(&self, uuid: &Uuid) -> Option<Arc<CatalogEntry>> {
        self.update(|snapshot| snapshot.remove(uuid))
    }

    pub fn remove_key(&self, key: &FileKey) -> Option<Arc<CatalogEntry>> {
        self.update(|snapshot| {
            let uuid = snapshot.by_key.get(key).copied()?;
            snapshot.remove(&uuid)
        })
    }

    /// All entries in first-store order
    pub fn list(&self) -> Vec<Arc<CatalogEntry>> {
        let mut entries: Vec<_> = self.current.load().by_uuid.values().cloned().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
    }

    pub fn len(&self) -> usize {
        self.current.load().by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CatalogIndex {
    fn default() -> Self {
        Self::new()
    }
}
