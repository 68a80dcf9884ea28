// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Health check endpoint.

use crate::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    /// Whether the store answered a ping.
    pub store_reachable: bool,
    pub cache_ttl_secs: u64,
}

/// GET /api/v1/health - Health check endpoint.
///
/// Always answers 200; an unreachable store only degrades the status.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_reachable = match state.engine.ping_store().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: (if store_reachable { "healthy" } else { "degraded" }).to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "fetchcache-server".to_string(),
        store_reachable,
        cache_ttl_secs: state.engine.ttl().as_secs(),
    })
}
