// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Upstream HTTP fetcher.

use async_trait::async_trait;
use fetchcache_core::{CachedResponse, RequestDescription};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use std::time::Duration;
use thiserror::Error;

/// Upstream failures: the exchange did not complete.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Upstream request failed: {0}")]
    Request(String),

    #[error("Upstream body read failed: {0}")]
    Body(String),

    #[error("Upstream exchange exceeded {0:?}")]
    Timeout(Duration),
}

/// Performs the outbound request described by a client.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, request: &RequestDescription) -> Result<CachedResponse, FetchError>;
}

/// reqwest-backed fetcher issuing one GET per call.
///
/// Any completed exchange is returned, whatever its status code.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher, optionally bounding each upstream exchange.
    pub fn new(timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
        })
    }

    /// Wrap a preconfigured client (proxy, TLS or redirect policy).
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

/// Upstream `Content-Type`, byte-for-byte.
///
/// A value that is not UTF-8 cannot be recorded verbatim; it is dropped
/// with a warning rather than rewritten.
fn content_type_of(headers: &HeaderMap, url: &str) -> String {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return String::new();
    };

    match std::str::from_utf8(value.as_bytes()) {
        Ok(text) => text.to_string(),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Dropping non-UTF-8 Content-Type");
            String::new()
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &RequestDescription) -> Result<CachedResponse, FetchError> {
        let resp = self
            .http
            .get(&request.url)
            .send()
            .await
            .map_err(|e| FetchError::Request(format!("GET {}: {e}", request.url)))?;

        let status = resp.status();
        let content_type = content_type_of(resp.headers(), &request.url);

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Body(format!("GET {}: {e}", request.url)))?;

        tracing::debug!(
            url = %request.url,
            status = status.as_u16(),
            content_type = %content_type,
            size = body.len(),
            "Fetched upstream"
        );

        Ok(CachedResponse::new(body, content_type))
    }
}
