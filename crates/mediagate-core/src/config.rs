//! Configuration module
//!
//! The whole service is configured once at startup. `Config::from_env` reads the
//! environment (after loading `.env`), and the resulting immutable struct is handed
//! to the router, limiter, and queue constructors. Nothing re-reads the
//! environment mid-operation.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::*;
use crate::storage_types::BackendKind;

/// HTTP edge settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
    pub max_upload_size_bytes: usize,
    /// `text` or `json`
    pub log_format: String,
}

/// One entry of the backend priority list
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub id: String,
    pub kind: BackendKind,
    /// Storage API base (HTTP backends only)
    pub api_url: Option<String>,
    /// Base URL under which stored files are publicly served
    pub public_url: String,
    pub timeout: Duration,
    /// Whether `put` is a keyed overwrite, safe to retry after an ambiguous failure
    pub idempotent_writes: bool,
}

/// Retry and deadline policy of the delegated storage router
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Retries per backend on 5xx / transport failure for `store`
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub attempt_timeout: Duration,
    pub operation_deadline: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_ROUTER_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            backoff_max: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
            attempt_timeout: Duration::from_millis(DEFAULT_ATTEMPT_TIMEOUT_MS),
            operation_deadline: Duration::from_millis(DEFAULT_OPERATION_DEADLINE_MS),
        }
    }
}

/// Fixed-window rate limiting, one window per route key
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub default_limit: u32,
    pub route_limits: HashMap<String, u32>,
}

impl RateLimitConfig {
    pub fn limit_for(&self, route_key: &str) -> u32 {
        self.route_limits
            .get(route_key)
            .copied()
            .unwrap_or(self.default_limit)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            default_limit: DEFAULT_RATE_LIMIT_PER_WINDOW,
            route_limits: HashMap::new(),
        }
    }
}

/// Bounded write admission
#[derive(Clone, Debug)]
pub struct UploadQueueConfig {
    pub capacity: usize,
    pub acquire_timeout: Duration,
}

impl Default for UploadQueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_UPLOAD_QUEUE_CAPACITY,
            acquire_timeout: Duration::from_millis(DEFAULT_UPLOAD_QUEUE_ACQUIRE_TIMEOUT_MS),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    /// Backends in priority order
    pub backends: Vec<BackendConfig>,
    pub router: RouterConfig,
    pub rate_limit: RateLimitConfig,
    pub upload_queue: UploadQueueConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let port: u16 = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => DEFAULT_SERVER_PORT,
        };

        let server = ServerConfig {
            port,
            environment,
            max_upload_size_bytes: parse_or(&lookup, "MAX_UPLOAD_SIZE_MB", DEFAULT_MAX_UPLOAD_SIZE_MB)
                * 1024
                * 1024,
            log_format: lookup("LOG_FORMAT")
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_else(|| "text".to_string()),
        };

        let backend_ids: Vec<String> = lookup("STORAGE_BACKENDS")
            .unwrap_or_else(|| DEFAULT_BACKEND_ID.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let default_public_url = format!("http://localhost:{}/files", port);
        let backends = backend_ids
            .iter()
            .map(|id| backend_from_lookup(&lookup, id, &default_public_url))
            .collect::<Result<Vec<_>, _>>()?;

        let router = RouterConfig {
            max_retries: parse_or(&lookup, "ROUTER_MAX_RETRIES", DEFAULT_ROUTER_MAX_RETRIES),
            backoff_base: millis_or(&lookup, "ROUTER_BACKOFF_BASE_MS", DEFAULT_BACKOFF_BASE_MS),
            backoff_max: millis_or(&lookup, "ROUTER_BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            attempt_timeout: millis_or(
                &lookup,
                "ROUTER_ATTEMPT_TIMEOUT_MS",
                DEFAULT_ATTEMPT_TIMEOUT_MS,
            ),
            operation_deadline: millis_or(
                &lookup,
                "ROUTER_OPERATION_DEADLINE_MS",
                DEFAULT_OPERATION_DEADLINE_MS,
            ),
        };

        let rate_limit = RateLimitConfig {
            window: millis_or(&lookup, "RATE_LIMIT_WINDOW_MS", DEFAULT_RATE_LIMIT_WINDOW_MS),
            default_limit: parse_or(&lookup, "RATE_LIMIT_PER_WINDOW", DEFAULT_RATE_LIMIT_PER_WINDOW),
            route_limits: parse_route_limits(lookup("RATE_LIMIT_ROUTES").as_deref())?,
        };

        let upload_queue = UploadQueueConfig {
            capacity: parse_or(&lookup, "UPLOAD_QUEUE_CAPACITY", DEFAULT_UPLOAD_QUEUE_CAPACITY),
            acquire_timeout: millis_or(
                &lookup,
                "UPLOAD_QUEUE_ACQUIRE_TIMEOUT_MS",
                DEFAULT_UPLOAD_QUEUE_ACQUIRE_TIMEOUT_MS,
            ),
        };

        let config = Config {
            server,
            backends,
            router,
            rate_limit,
            upload_queue,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.backends.is_empty() {
            return Err(anyhow::anyhow!(
                "STORAGE_BACKENDS must name at least one backend"
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for backend in &self.backends {
            if !seen.insert(backend.id.as_str()) {
                return Err(anyhow::anyhow!(
                    "Storage backend '{}' is listed more than once",
                    backend.id
                ));
            }
            if backend.kind == BackendKind::Http && backend.api_url.is_none() {
                return Err(anyhow::anyhow!(
                    "{} must be set for HTTP backend '{}'",
                    backend_var(&backend.id, "API_URL"),
                    backend.id
                ));
            }
        }

        if self.upload_queue.capacity == 0 {
            return Err(anyhow::anyhow!("UPLOAD_QUEUE_CAPACITY must be at least 1"));
        }
        if self.rate_limit.window.is_zero() {
            return Err(anyhow::anyhow!("RATE_LIMIT_WINDOW_MS must be positive"));
        }
        if self.router.backoff_max < self.router.backoff_base {
            return Err(anyhow::anyhow!(
                "ROUTER_BACKOFF_MAX_MS must not be smaller than ROUTER_BACKOFF_BASE_MS"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.server.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn backend_ids(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.id.clone()).collect()
    }
}

/// Per-backend variable name: `STORAGE_BACKEND_<ID>_<SUFFIX>`.
fn backend_var(id: &str, suffix: &str) -> String {
    let id: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("STORAGE_BACKEND_{}_{}", id, suffix)
}

fn backend_from_lookup<F>(
    lookup: &F,
    id: &str,
    default_public_url: &str,
) -> Result<BackendConfig, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
{
    let kind = match lookup(&backend_var(id, "KIND")) {
        Some(raw) => BackendKind::from_str(&raw)?,
        None => BackendKind::Memory,
    };

    let idempotent_writes = lookup(&backend_var(id, "IDEMPOTENT_WRITES"))
        .and_then(|s| s.trim().to_lowercase().parse().ok())
        .unwrap_or_else(|| kind.default_idempotent_writes());

    Ok(BackendConfig {
        id: id.to_string(),
        kind,
        api_url: lookup(&backend_var(id, "API_URL")),
        public_url: lookup(&backend_var(id, "PUBLIC_URL"))
            .unwrap_or_else(|| default_public_url.to_string()),
        timeout: millis_or(
            lookup,
            &backend_var(id, "TIMEOUT_MS"),
            DEFAULT_BACKEND_TIMEOUT_MS,
        ),
        idempotent_writes,
    })
}

/// Parse `"/file=10,/catalog=200"` into per-route limits.
fn parse_route_limits(raw: Option<&str>) -> Result<HashMap<String, u32>, anyhow::Error> {
    let mut limits = HashMap::new();
    let Some(raw) = raw else {
        return Ok(limits);
    };

    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (route, limit) = pair
            .rsplit_once('=')
            .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_ROUTES entry '{}' must be route=limit", pair))?;
        let limit: u32 = limit
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("RATE_LIMIT_ROUTES limit for '{}' must be a number", route))?;
        limits.insert(route.trim().to_string(), limit);
    }

    Ok(limits)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn millis_or<F>(lookup: &F, key: &str, default_ms: u64) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    Duration::from_millis(parse_or(lookup, key, default_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_single_memory_backend() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.backend_ids(), vec!["memory".to_string()]);
        assert_eq!(config.backends[0].kind, BackendKind::Memory);
        assert!(config.backends[0].idempotent_writes);
        assert_eq!(config.backends[0].public_url, "http://localhost:4000/files");
        assert_eq!(config.upload_queue.capacity, 5);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.router.max_retries, 2);
    }

    #[test]
    fn reads_backend_priority_list() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKENDS", "primary, backup"),
            ("STORAGE_BACKEND_PRIMARY_KIND", "http"),
            ("STORAGE_BACKEND_PRIMARY_API_URL", "http://storage-a/api"),
            ("STORAGE_BACKEND_PRIMARY_PUBLIC_URL", "https://cdn-a.example.com"),
            ("STORAGE_BACKEND_PRIMARY_TIMEOUT_MS", "2500"),
            ("STORAGE_BACKEND_BACKUP_KIND", "memory"),
        ]))
        .unwrap();

        assert_eq!(config.backend_ids(), vec!["primary", "backup"]);
        let primary = &config.backends[0];
        assert_eq!(primary.kind, BackendKind::Http);
        assert_eq!(primary.api_url.as_deref(), Some("http://storage-a/api"));
        assert_eq!(primary.public_url, "https://cdn-a.example.com");
        assert_eq!(primary.timeout, Duration::from_millis(2500));
        assert!(!primary.idempotent_writes);
    }

    #[test]
    fn http_backend_requires_api_url() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKENDS", "edge-1"),
            ("STORAGE_BACKEND_EDGE_1_KIND", "http"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("STORAGE_BACKEND_EDGE_1_API_URL"));
    }

    #[test]
    fn rejects_duplicate_backends() {
        let err = Config::from_lookup(lookup_from(&[("STORAGE_BACKENDS", "a,a")])).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn parses_route_limits() {
        let config = Config::from_lookup(lookup_from(&[
            ("RATE_LIMIT_PER_WINDOW", "50"),
            ("RATE_LIMIT_ROUTES", "/file=10, /catalog=200"),
        ]))
        .unwrap();
        assert_eq!(config.rate_limit.limit_for("/file"), 10);
        assert_eq!(config.rate_limit.limit_for("/catalog"), 200);
        assert_eq!(config.rate_limit.limit_for("/files/a.webp"), 50);

        assert!(Config::from_lookup(lookup_from(&[("RATE_LIMIT_ROUTES", "/file")])).is_err());
    }

    #[test]
    fn invalid_port_is_an_error() {
        assert!(Config::from_lookup(lookup_from(&[("PORT", "http")])).is_err());
    }
}
