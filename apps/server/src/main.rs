// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! fetchcache server entry point.

use anyhow::Context;
use fetchcache_server::config::{Config, StoreBackend};
use fetchcache_server::services::{HttpFetcher, MemoryStore, RedisStore, Store};
use fetchcache_server::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,fetchcache_server=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env();
    config.validate()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        store_backend = ?config.store_backend,
        redis_addr = %config.redis.addr,
        redis_db = config.redis.db,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        request_timeout_secs = config.request_timeout_secs,
        "Starting fetchcache server"
    );

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Redis => Arc::new(
            RedisStore::connect(&config.redis)
                .await
                .context("failed to connect to Redis")?,
        ),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    store.ping().await.context("store health check failed")?;

    let fetcher = Arc::new(
        HttpFetcher::new(config.upstream_timeout).context("failed to build HTTP client")?,
    );

    let listen_addr = config.listen_addr.clone();
    let app = fetchcache_server::app(AppState::new(store, fetcher, config));

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", listen_addr))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
