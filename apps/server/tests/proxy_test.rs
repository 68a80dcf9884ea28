// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests: a real upstream, the proxy on a local port, and an
//! in-memory store.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use fetchcache_core::{fingerprint, RequestDescription};
use fetchcache_server::config::Config;
use fetchcache_server::routes::health::HealthResponse;
use fetchcache_server::services::{HttpFetcher, MemoryStore, Store, StoreError};
use fetchcache_server::{app, AppState};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const BINARY_BODY: &[u8] = &[0x89, b'P', b'N', b'G', 0x00, 0xff, 0xfe, 0x80];

struct Upstream {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl Upstream {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn upstream_response(uri: Uri) -> Response {
    match uri.path() {
        "/a" => ([(header::CONTENT_TYPE, "text/plain")], "A").into_response(),
        "/y" => ([(header::CONTENT_TYPE, "text/plain")], "Y").into_response(),
        "/missing" => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain")],
            "nope",
        )
            .into_response(),
        "/binary" => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            BINARY_BODY,
        )
            .into_response(),
        "/untyped" => Body::from("raw").into_response(),
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            ([(header::CONTENT_TYPE, "text/plain")], "late").into_response()
        }
        _ => ([(header::CONTENT_TYPE, "text/html")], "<p>ok</p>").into_response(),
    }
}

async fn spawn_upstream() -> Upstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let router = Router::new().fallback(move |uri: Uri| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            upstream_response(uri).await
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Upstream { addr, hits }
}

async fn spawn_proxy(store: Arc<dyn Store>, ttl: Duration) -> String {
    let config = Config {
        cache_ttl: ttl,
        ..Config::default()
    };
    spawn_proxy_with(store, config).await
}

async fn spawn_proxy_with(store: Arc<dyn Store>, config: Config) -> String {
    let fetcher = Arc::new(HttpFetcher::from_client(client()));
    let router = app(AppState::new(store, fetcher, config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Loopback-only client; ignores any proxy configured in the environment.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

async fn post(proxy: &str, body: impl Into<String>) -> reqwest::Response {
    client()
        .post(format!("{}/", proxy))
        .body(body.into())
        .send()
        .await
        .unwrap()
}

fn url_body(url: &str) -> String {
    serde_json::json!({ "url": url }).to_string()
}

fn content_type(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string())
}

fn cache_status(resp: &reqwest::Response) -> String {
    resp.headers()["x-cache"].to_str().unwrap().to_string()
}

/// Store that refuses every operation.
struct DownStore;

#[async_trait]
impl Store for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn test_hit_replays_seeded_entry() {
    let upstream = spawn_upstream().await;
    let store = Arc::new(MemoryStore::new());
    let proxy = spawn_proxy(store.clone(), Duration::from_secs(60)).await;

    let url = upstream.url("/x");
    let key = fingerprint(&RequestDescription::new(url.clone()))
        .unwrap()
        .to_key();
    store
        .set(
            &key,
            r#"{"string":"hello","ContentType":"text/plain"}"#.into(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    let resp = post(&proxy, url_body(&url)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(content_type(&resp).as_deref(), Some("text/plain"));
    assert_eq!(cache_status(&resp), "HIT");
    assert_eq!(resp.text().await.unwrap(), "hello");
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_miss_then_hit() {
    let upstream = spawn_upstream().await;
    let proxy = spawn_proxy(Arc::new(MemoryStore::new()), Duration::from_secs(60)).await;
    let body = url_body(&upstream.url("/a"));

    let first = post(&proxy, body.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(cache_status(&first), "MISS");
    assert_eq!(content_type(&first).as_deref(), Some("text/plain"));
    assert_eq!(first.text().await.unwrap(), "A");
    assert_eq!(upstream.hits(), 1);

    let second = post(&proxy, body).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(cache_status(&second), "HIT");
    assert_eq!(content_type(&second).as_deref(), Some("text/plain"));
    assert_eq!(second.text().await.unwrap(), "A");
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let upstream = spawn_upstream().await;
    let store = Arc::new(MemoryStore::new());
    let proxy = spawn_proxy(store.clone(), Duration::from_secs(60)).await;

    let resp = post(&proxy, "not json").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(upstream.hits(), 0);
    assert!(store.is_empty().await);

    let resp = post(&proxy, r#"{"url":""}"#).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_upstream_failure_is_not_cached() {
    let store = Arc::new(MemoryStore::new());
    let proxy = spawn_proxy(store.clone(), Duration::from_secs(60)).await;

    // Nothing listens on port 1.
    let resp = post(&proxy, url_body("http://127.0.0.1:1/unreachable")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_slow_upstream_times_out_as_server_error() {
    let upstream = spawn_upstream().await;
    let store = Arc::new(MemoryStore::new());
    let config = Config {
        request_timeout_secs: 1,
        ..Config::default()
    };
    let proxy = spawn_proxy_with(store.clone(), config).await;

    let resp = post(&proxy, url_body(&upstream.url("/slow"))).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "UPSTREAM_ERROR");

    // The abandoned fetch must not land in the store later.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(store.is_empty().await);
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_ttl_expiry_refetches() {
    let upstream = spawn_upstream().await;
    let proxy = spawn_proxy(Arc::new(MemoryStore::new()), Duration::from_secs(1)).await;
    let body = url_body(&upstream.url("/a"));

    assert_eq!(post(&proxy, body.clone()).await.status(), StatusCode::OK);
    assert_eq!(upstream.hits(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;

    let resp = post(&proxy, body).await;
    assert_eq!(cache_status(&resp), "MISS");
    assert_eq!(resp.text().await.unwrap(), "A");
    assert_eq!(upstream.hits(), 2);
}

#[tokio::test]
async fn test_equivalent_requests_share_cache() {
    let upstream = spawn_upstream().await;
    let proxy = spawn_proxy(Arc::new(MemoryStore::new()), Duration::from_secs(60)).await;
    let url = upstream.url("/y");

    let first = post(&proxy, format!(r#"{{"url":"{}"}}"#, url)).await;
    assert_eq!(first.text().await.unwrap(), "Y");
    assert_eq!(upstream.hits(), 1);

    let spaced = post(&proxy, format!("{{\n  \"url\" :   \"{}\"\n}}", url)).await;
    assert_eq!(cache_status(&spaced), "HIT");
    assert_eq!(spaced.text().await.unwrap(), "Y");

    let extra = post(&proxy, format!(r#"{{"comment":"ignored","url":"{}"}}"#, url)).await;
    assert_eq!(cache_status(&extra), "HIT");
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_store_down_still_serves_upstream() {
    let upstream = spawn_upstream().await;
    let proxy = spawn_proxy(Arc::new(DownStore), Duration::from_secs(60)).await;
    let body = url_body(&upstream.url("/a"));

    for expected_hits in 1..=2 {
        let resp = post(&proxy, body.clone()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(cache_status(&resp), "MISS");
        assert_eq!(resp.text().await.unwrap(), "A");
        assert_eq!(upstream.hits(), expected_hits);
    }
}

#[tokio::test]
async fn test_upstream_errors_are_cached() {
    let upstream = spawn_upstream().await;
    let proxy = spawn_proxy(Arc::new(MemoryStore::new()), Duration::from_secs(60)).await;
    let body = url_body(&upstream.url("/missing"));

    for expected in ["MISS", "HIT"] {
        let resp = post(&proxy, body.clone()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(cache_status(&resp), expected);
        assert_eq!(resp.text().await.unwrap(), "nope");
    }
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_binary_body_survives_cache() {
    let upstream = spawn_upstream().await;
    let proxy = spawn_proxy(Arc::new(MemoryStore::new()), Duration::from_secs(60)).await;
    let body = url_body(&upstream.url("/binary"));

    for expected in ["MISS", "HIT"] {
        let resp = post(&proxy, body.clone()).await;
        assert_eq!(cache_status(&resp), expected);
        assert_eq!(
            content_type(&resp).as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(&resp.bytes().await.unwrap()[..], BINARY_BODY);
    }
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_missing_content_type_is_not_invented() {
    let upstream = spawn_upstream().await;
    let proxy = spawn_proxy(Arc::new(MemoryStore::new()), Duration::from_secs(60)).await;
    let body = url_body(&upstream.url("/untyped"));

    for _ in 0..2 {
        let resp = post(&proxy, body.clone()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(content_type(&resp), None);
        assert_eq!(resp.text().await.unwrap(), "raw");
    }
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_root_accepts_any_method() {
    let upstream = spawn_upstream().await;
    let proxy = spawn_proxy(Arc::new(MemoryStore::new()), Duration::from_secs(60)).await;

    let resp = client()
        .put(format!("{}/", proxy))
        .body(url_body(&upstream.url("/a")))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "A");
}

#[tokio::test]
async fn test_health_reports_store_state() {
    let proxy = spawn_proxy(Arc::new(MemoryStore::new()), Duration::from_secs(60)).await;
    let health: HealthResponse = client()
        .get(format!("{}/api/v1/health", proxy))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "healthy");
    assert!(health.store_reachable);
    assert_eq!(health.cache_ttl_secs, 60);

    let proxy = spawn_proxy(Arc::new(DownStore), Duration::from_secs(60)).await;
    let resp = client()
        .get(format!("{}/api/v1/health", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = resp.json().await.unwrap();
    assert_eq!(health.status, "degraded");
    assert!(!health.store_reachable);
}
