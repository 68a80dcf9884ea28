// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service modules for the cache engine, its store backends and the fetcher.

pub mod engine;
pub mod fetcher;
pub mod memory_store;
pub mod redis_store;
pub mod store;

pub use engine::{CacheEngine, CacheStatus, Served};
pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{Store, StoreError};
