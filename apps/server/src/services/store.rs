// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key-value store abstraction consumed by the cache engine.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Store failures. An absent key is not an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),

    /// A fetched response could not be encoded for writing.
    #[error("Cannot encode cache entry: {0}")]
    Serialize(String),
}

/// String-keyed, string-valued store with per-entry TTL.
///
/// Implementations are shared by every in-flight request and must be safe
/// for concurrent use.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
