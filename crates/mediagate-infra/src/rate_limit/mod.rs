//! Rate limiting service
//!
//! Fixed-window counting with one window per route key. The route key is the
//! raw request path, so the ceiling applies to the route's global traffic and
//! not per client.

pub use limiter::{RateDecision, RateLimiter};

mod limiter;
