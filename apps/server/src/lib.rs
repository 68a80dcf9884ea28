// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! fetchcache server - caching HTTP proxy keyed by request fingerprints.
//!
//! Clients post a request description; the server replays the recorded
//! response for an equivalent request, or performs the request, records the
//! response in the store with a TTL, and returns it.
//!
//! # Endpoints
//!
//! - `ANY /` - Body `{"url": "..."}`; replies with the upstream body and
//!   content type, `x-cache: HIT|MISS`
//! - `GET /api/v1/health` - Health check including store reachability

use axum::{
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod routes;
pub mod services;

use config::Config;
use services::{CacheEngine, Fetcher, Store};

/// Application state shared across handlers. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CacheEngine>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>, config: Config) -> Self {
        Self {
            engine: Arc::new(CacheEngine::new(store, fetcher, config.cache_ttl)),
            config: Arc::new(config),
        }
    }
}

/// Build the router with its middleware stack.
pub fn app(state: AppState) -> Router {
    Router::new()
        // Caching proxy endpoint
        .route("/", any(routes::proxy::proxy))
        // Health check
        .route("/api/v1/health", get(routes::health::check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
