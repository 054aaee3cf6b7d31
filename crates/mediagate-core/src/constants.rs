//! Defaults and well-known names shared across crates.

/// Key name used for files stored through `POST /file`.
pub const DEFAULT_KEY_NAME: &str = "unique_name";

/// Change applied by the invalidation path to mark a file as stale.
pub const EXPIRED_CHANGE_KEY: &str = "expired";

pub const DEFAULT_SERVER_PORT: u16 = 4000;
pub const DEFAULT_BACKEND_ID: &str = "memory";
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 10_000;

pub const DEFAULT_ROUTER_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 100;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 2_000;
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_OPERATION_DEADLINE_MS: u64 = 30_000;

pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
pub const DEFAULT_RATE_LIMIT_PER_WINDOW: u32 = 100;

pub const DEFAULT_UPLOAD_QUEUE_CAPACITY: usize = 5;
pub const DEFAULT_UPLOAD_QUEUE_ACQUIRE_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_MAX_UPLOAD_SIZE_MB: usize = 50;
