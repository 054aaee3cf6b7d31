use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use mediagate_core::{AppError, RateLimitConfig};

#[derive(Debug)]
struct RateWindow {
    window_start: Instant,
    count: u32,
    limit: u32,
}

impl RateWindow {
    fn new(limit: u32, now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
            limit,
        }
    }

    /// Count one request. Over-limit requests are still counted.
    fn record(&mut self, now: Instant, size: Duration) -> bool {
        if now.duration_since(self.window_start) >= size {
            self.window_start = now;
            self.count = 1;
            return true;
        }
        self.count = self.count.saturating_add(1);
        self.count <= self.limit
    }

    fn reset_in(&self, now: Instant, size: Duration) -> Duration {
        (self.window_start + size).saturating_duration_since(now)
    }
}

/// Outcome of one admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window resets
    pub reset_in: Duration,
}

type Shard = RwLock<HashMap<String, Arc<Mutex<RateWindow>>>>;

/// Fixed-window rate limiter keyed by route
///
/// Windows live in sharded maps. A shard lock is only held to find or insert a
/// window; counting happens under the window's own mutex, so callers on the
/// same route serialize while different routes never share a lock.
pub struct RateLimiter {
    shards: Vec<Shard>,
    window_size: Duration,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter with default shard count (16 shards)
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_shards(config, 16)
    }

    pub fn with_shards(config: RateLimitConfig, shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards,
            window_size: config.window,
            config,
        }
    }

    pub fn window_size(&self) -> Duration {
        self.window_size
    }

    pub fn limit_for(&self, route_key: &str) -> u32 {
        self.config.limit_for(route_key)
    }

    fn shard(&self, route_key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        route_key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    fn window(&self, route_key: &str, now: Instant) -> Arc<Mutex<RateWindow>> {
        let shard = self.shard(route_key);
        if let Some(window) = shard
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(route_key)
        {
            return window.clone();
        }

        let limit = self.limit_for(route_key);
        shard
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(route_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(RateWindow::new(limit, now))))
            .clone()
    }

    /// Count a request against `route_key` and decide whether to admit it.
    ///
    /// Never blocks on anything but the route's own window.
    pub fn admit(&self, route_key: &str) -> RateDecision {
        let now = Instant::now();
        let window = self.window(route_key, now);
        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);

        let allowed = window.record(now, self.window_size);
        let decision = RateDecision {
            allowed,
            limit: window.limit,
            remaining: window.limit.saturating_sub(window.count),
            reset_in: window.reset_in(now, self.window_size),
        };

        if !allowed {
            tracing::debug!(
                route_key = %route_key,
                count = window.count,
                limit = window.limit,
                reset_in_ms = decision.reset_in.as_millis() as u64,
                "Rate limit exceeded"
            );
        }

        decision
    }

    /// Like `admit`, but reports a rejection as `AppError::RateLimited`.
    pub fn check(&self, route_key: &str) -> Result<RateDecision, AppError> {
        let decision = self.admit(route_key);
        if decision.allowed {
            Ok(decision)
        } else {
            Err(AppError::RateLimited {
                route_key: route_key.to_string(),
                limit: decision.limit,
                retry_after: decision.reset_in,
            })
        }
    }

    /// Drop windows idle for more than two window lengths. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let grace = self.window_size * 2;
        let mut total_cleaned = 0;

        for shard in &self.shards {
            let mut windows = shard.write().unwrap_or_else(PoisonError::into_inner);
            let before = windows.len();
            windows.retain(|_, window| {
                let window = window.lock().unwrap_or_else(PoisonError::into_inner);
                now.duration_since(window.window_start) < grace
            });
            total_cleaned += before - windows.len();
        }

        if total_cleaned > 0 {
            tracing::debug!(
                windows_cleaned = total_cleaned,
                "Cleaned up expired rate limit windows"
            );
        }
        total_cleaned
    }

    /// Number of tracked route windows
    pub fn window_count(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Run `cleanup_expired` once per window until the limiter is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = Arc::downgrade(self);
        let period = self.window_size;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                match limiter.upgrade() {
                    Some(limiter) => {
                        limiter.cleanup_expired();
                    }
                    None => break,
                }
            }
        })
    }
}
