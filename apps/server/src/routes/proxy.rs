// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Caching proxy endpoint.

use crate::error::ApiError;
use crate::services::{FetchError, Served};
use crate::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use fetchcache_core::RequestDescription;
use std::time::Duration;

/// Reports whether the reply was replayed from the store.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// ANY / - Serve a request description through the cache.
///
/// The whole exchange runs under `REQUEST_TIMEOUT_SECS`. Running out of
/// budget drops the in-flight store and upstream calls and fails the
/// request as an upstream error, so nothing is cached.
pub async fn proxy(State(state): State<AppState>, body: Body) -> Result<Response, ApiError> {
    let budget = Duration::from_secs(state.config.request_timeout_secs);

    let served = tokio::time::timeout(budget, async {
        let bytes = axum::body::to_bytes(body, state.config.max_body_bytes)
            .await
            .map_err(|e| ApiError::BodyRead(e.to_string()))?;

        let request = RequestDescription::decode(&bytes)?;
        state.engine.serve(&request).await
    })
    .await
    .map_err(|_| ApiError::Upstream(FetchError::Timeout(budget)))??;

    reply(served)
}

fn reply(served: Served) -> Result<Response, ApiError> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(X_CACHE, served.status.as_str());

    if !served.response.content_type.is_empty() {
        let content_type = HeaderValue::from_str(&served.response.content_type).map_err(|e| {
            ApiError::ResponseWrite(format!(
                "invalid content type {:?}: {e}",
                served.response.content_type
            ))
        })?;
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    builder
        .body(Body::from(served.response.body))
        .map_err(|e| ApiError::ResponseWrite(e.to_string()))
}
