// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-through cache engine.
//!
//! Per request: fingerprint the description, look the key up in the store,
//! and either replay the recorded response or fetch upstream and record it.
//! Store trouble never fails a request: lookup errors fall through to the
//! miss path and write errors are only logged.

use super::fetcher::Fetcher;
use super::store::{Store, StoreError};
use crate::error::ApiError;
use fetchcache_core::{fingerprint, CachedResponse, Fingerprint, RequestDescription};
use std::sync::Arc;
use std::time::Duration;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Response ready to be replayed to the client.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: CachedResponse,
    pub status: CacheStatus,
}

/// Mediates between the store and the upstream fetcher.
pub struct CacheEngine {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn Fetcher>,
    ttl: Duration,
}

impl CacheEngine {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>, ttl: Duration) -> Self {
        Self {
            store,
            fetcher,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check that the store answers.
    pub async fn ping_store(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    /// Read and decode the entry for `fingerprint`.
    ///
    /// An entry that fails to decode is reported as [`StoreError::Corrupt`],
    /// not as a miss.
    pub async fn lookup(
        &self,
        fingerprint: Fingerprint,
    ) -> Result<Option<CachedResponse>, StoreError> {
        let Some(data) = self.store.get(&fingerprint.to_key()).await? else {
            return Ok(None);
        };

        CachedResponse::deserialize(&data)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// Encode `response` and write it under `fingerprint` with the configured TTL.
    pub async fn store(
        &self,
        fingerprint: Fingerprint,
        response: &CachedResponse,
    ) -> Result<(), StoreError> {
        let data = response
            .serialize()
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        let size = data.len();

        self.store.set(&fingerprint.to_key(), data, self.ttl).await?;
        tracing::debug!(key = %fingerprint, size, ttl_ms = self.ttl.as_millis() as u64, "Cached response");
        Ok(())
    }

    /// Serve one request description.
    pub async fn serve(&self, request: &RequestDescription) -> Result<Served, ApiError> {
        let fingerprint = fingerprint(request)?;

        match self.lookup(fingerprint).await {
            Ok(Some(response)) => {
                tracing::info!(key = %fingerprint, url = %request.url, "Cache HIT");
                return Ok(Served {
                    response,
                    status: CacheStatus::Hit,
                });
            }
            Ok(None) => {
                tracing::info!(key = %fingerprint, url = %request.url, "Cache MISS - fetching");
            }
            Err(e) => {
                tracing::warn!(
                    key = %fingerprint,
                    url = %request.url,
                    error = %e,
                    "Cache lookup failed - fetching"
                );
            }
        }

        let response = self.fetcher.fetch(request).await?;

        if let Err(e) = self.store(fingerprint, &response).await {
            tracing::error!(key = %fingerprint, error = %e, "Failed to cache response");
        }

        Ok(Served {
            response,
            status: CacheStatus::Miss,
        })
    }
}
