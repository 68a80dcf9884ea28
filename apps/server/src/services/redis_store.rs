// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Redis-backed store.

use super::store::{Store, StoreError};
use crate::config::RedisSettings;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionInfo, IntoConnectionInfo};
use std::time::Duration;

/// Store backed by a Redis-compatible server.
///
/// Holds a [`ConnectionManager`], a multiplexed connection that reconnects
/// on failure. Clones share the same connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl RedisStore {
    /// Open a managed connection to the configured server.
    pub async fn connect(settings: &RedisSettings) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_info(settings)?)?;
        let conn = ConnectionManager::new(client).await?;

        tracing::info!(
            addr = %settings.addr,
            db = settings.db,
            "Connected to Redis"
        );

        Ok(Self { conn })
    }
}

fn connection_info(settings: &RedisSettings) -> Result<ConnectionInfo, StoreError> {
    let mut info = format!("redis://{}", settings.addr).into_connection_info()?;
    info.redis.db = settings.db;
    info.redis.password = settings.password.clone();
    Ok(info)
}

/// Entries are written as text; bytes that are not UTF-8 mean the entry
/// was damaged or written by something else.
fn decode_value(raw: Option<Vec<u8>>) -> Result<Option<String>, StoreError> {
    raw.map(String::from_utf8)
        .transpose()
        .map_err(|e| StoreError::Corrupt(format!("entry is not UTF-8: {}", e)))
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = conn.get(key).await?;
        decode_value(raw)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        // PX takes whole milliseconds and rejects 0.
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
