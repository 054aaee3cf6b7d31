//! HTTP-level names shared by handlers and middleware.

/// Lets a client shorten the operation deadline (milliseconds).
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Cache policy for files served through `GET /files/...`
pub const PUBLIC_CACHE_CONTROL: &str = "public, max-age=3600";

pub const SERVICE_NAME: &str = "mediagate";
