//! Domain models shared by the router, the adapters, and the HTTP edge.

mod attempt;
mod backend_result;
mod catalog;
mod file;
mod invalidation;
mod storage_control;

pub use attempt::{AttemptDisposition, BackendAttempt};
pub(crate) use attempt::summarize;
pub use backend_result::BackendResult;
pub use catalog::CatalogEntry;
pub use file::{Changes, FileKey, FileRecord};
pub use invalidation::{InvalidationOperation, InvalidationSignal};
pub use storage_control::{StorageControlItem, StorageControlRequest};
