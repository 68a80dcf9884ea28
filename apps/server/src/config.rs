// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration loaded from environment variables.

use std::time::Duration;

/// Which store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Connection settings for the Redis store.
#[derive(Debug, Clone)]
pub struct RedisSettings {
    /// `host:port` of the server.
    pub addr: String,
    pub password: Option<String>,
    /// Database index.
    pub db: i64,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on.
    pub listen_addr: String,
    /// Store backend.
    pub store_backend: StoreBackend,
    /// Redis connection settings (used with [`StoreBackend::Redis`]).
    pub redis: RedisSettings,
    /// TTL applied to every cache entry.
    pub cache_ttl: Duration,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Optional bound on each upstream exchange.
    pub upstream_timeout: Option<Duration>,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            store_backend: match std::env::var("STORE_BACKEND") {
                Ok(value) if value.eq_ignore_ascii_case("memory") => StoreBackend::Memory,
                _ => StoreBackend::Redis,
            },
            redis: RedisSettings {
                addr: std::env::var("REDIS_ADDR").unwrap_or(defaults.redis.addr),
                password: std::env::var("REDIS_PASSWORD")
                    .ok()
                    .filter(|s| !s.is_empty()),
                db: std::env::var("REDIS_DB")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.redis.db),
            },
            cache_ttl: std::env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            upstream_timeout: std::env::var("UPSTREAM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
        }
    }

    /// Reject settings the store cannot honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.cache_ttl.is_zero(), "cache TTL must be greater than zero");
        anyhow::ensure!(self.max_body_bytes > 0, "MAX_BODY_BYTES must be greater than zero");
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".into(),
            store_backend: StoreBackend::Redis,
            redis: RedisSettings {
                addr: "localhost:6379".into(),
                password: None,
                db: 0,
            },
            cache_ttl: Duration::from_secs(60),
            request_timeout_secs: 30,
            upstream_timeout: None,
            max_body_bytes: 64 * 1024,
        }
    }
}
