//! Scriptable backend for router and API tests
//!
//! `ScriptedBackend` wraps a `MemoryBackend`. Each operation has a queue of
//! scripted replies that are consumed first; once a queue is empty the call is
//! served by the memory backend (or by the operation's `always` reply, if set).

use crate::memory::MemoryBackend;
use crate::traits::{AdapterResult, BackendAdapter, BackendError};
use async_trait::async_trait;
use mediagate_core::models::{Changes, FileKey};
use mediagate_core::{BackendKind, BackendResult, FileRecord};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Put,
    Get,
    Patch,
    Delete,
}

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Scripted {
    Status(u16),
    Unreachable,
    Timeout,
    Interrupted,
    /// Never answers
    Hang,
}

impl Scripted {
    async fn play(&self) -> AdapterResult {
        match self {
            Scripted::Status(code) => Ok(BackendResult::new(*code)),
            Scripted::Unreachable => Err(BackendError::Unreachable("connection refused".into())),
            Scripted::Timeout => Err(BackendError::Timeout("no reply".into())),
            Scripted::Interrupted => Err(BackendError::Interrupted("connection reset".into())),
            Scripted::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(BackendError::Timeout("hung".into()))
            }
        }
    }
}

#[derive(Default)]
struct Script {
    queued: HashMap<Op, VecDeque<Scripted>>,
    always: HashMap<Op, Scripted>,
}

pub struct ScriptedBackend {
    inner: MemoryBackend,
    idempotent_writes: bool,
    latency: Duration,
    script: Mutex<Script>,
    calls: HashMap<Op, AtomicU32>,
}

impl ScriptedBackend {
    pub fn new(id: &str) -> Self {
        let calls = [Op::Put, Op::Get, Op::Patch, Op::Delete]
            .into_iter()
            .map(|op| (op, AtomicU32::new(0)))
            .collect();
        Self {
            inner: MemoryBackend::new(id, format!("https://{}.example.com", id)),
            idempotent_writes: false,
            latency: Duration::ZERO,
            script: Mutex::new(Script::default()),
            calls,
        }
    }

    /// Queue replies consumed in order before falling back to normal behavior
    pub fn then(self, op: Op, replies: impl IntoIterator<Item = Scripted>) -> Self {
        self.script
            .lock()
            .unwrap()
            .queued
            .entry(op)
            .or_default()
            .extend(replies);
        self
    }

    /// Answer every call of `op` with `reply` once the queue is drained
    pub fn always(self, op: Op, reply: Scripted) -> Self {
        self.script.lock().unwrap().always.insert(op, reply);
        self
    }

    pub fn with_idempotent_writes(mut self, idempotent: bool) -> Self {
        self.idempotent_writes = idempotent;
        self
    }

    /// Delay every call, to hold write slots open in queue tests
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self, op: Op) -> u32 {
        self.calls[&op].load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &MemoryBackend {
        &self.inner
    }

    async fn scripted(&self, op: Op) -> Option<AdapterResult> {
        self.calls[&op].fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = {
            let mut script = self.script.lock().unwrap();
            script
                .queued
                .get_mut(&op)
                .and_then(VecDeque::pop_front)
                .or_else(|| script.always.get(&op).cloned())
        };

        match reply {
            Some(reply) => Some(reply.play().await),
            None => None,
        }
    }
}

#[async_trait]
impl BackendAdapter for ScriptedBackend {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn idempotent_writes(&self) -> bool {
        self.idempotent_writes
    }

    fn public_url(&self, storage_key: &str) -> String {
        self.inner.public_url(storage_key)
    }

    async fn put(&self, record: &FileRecord) -> AdapterResult {
        match self.scripted(Op::Put).await {
            Some(reply) => reply,
            None => self.inner.put(record).await,
        }
    }

    async fn get(&self, key_value: &str) -> AdapterResult {
        match self.scripted(Op::Get).await {
            Some(reply) => reply,
            None => self.inner.get(key_value).await,
        }
    }

    async fn patch(&self, key: &FileKey, changes: &Changes) -> AdapterResult {
        match self.scripted(Op::Patch).await {
            Some(reply) => reply,
            None => self.inner.patch(key, changes).await,
        }
    }

    async fn delete(&self, key: &FileKey) -> AdapterResult {
        match self.scripted(Op::Delete).await {
            Some(reply) => reply,
            None => self.inner.delete(key).await,
        }
    }
}
