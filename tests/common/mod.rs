#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};

use content_api::app::{router, AppState};
use content_api::auth::{generate_jwt, Claims};
use content_api::config;
use content_api::services::{FeedError, FeedSource, PassthroughResizer};
use content_api::storage::LocalObjectStore;
use content_api::store::MemoryDocumentStore;

/// Upstream stand-in: echoes the request and counts calls
pub struct StubFeed {
    calls: AtomicUsize,
    delay: Duration,
}

impl StubFeed {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for StubFeed {
    async fn fetch(&self, subject: &str, query: &str) -> Result<Value, FeedError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        Ok(json!({ "subject": subject, "query": query, "call": call }))
    }
}

/// The full router on a free port, backed by the in-memory store
pub struct TestServer {
    pub base_url: String,
    pub documents: Arc<MemoryDocumentStore>,
    pub feed: Arc<StubFeed>,
    pub storage_root: PathBuf,
    client: reqwest::Client,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.storage_root);
    }
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = config::config();
        let documents = Arc::new(MemoryDocumentStore::new());
        let feed = Arc::new(StubFeed { calls: AtomicUsize::new(0), delay: Duration::from_millis(50) });
        let storage_root = std::env::temp_dir().join(format!("content-api-it-{}", port));
        let objects = Arc::new(LocalObjectStore::new(&storage_root, format!("{}/assets", base_url)));

        let state = AppState::new(documents.clone(), feed.clone(), objects, Arc::new(PassthroughResizer), config);
        let app = router(state, config);
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self { base_url, documents, feed, storage_root, client: reqwest::Client::new() };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub fn put(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    pub fn anonymous(&self) -> &reqwest::Client {
        &self.client
    }
}

pub fn token(sub: &str, app_id: &str, org_id: &str) -> String {
    let claims = Claims::new(sub.into(), app_id.into(), org_id.into(), vec![]);
    generate_jwt(&claims).expect("token")
}

pub fn admin_token(sub: &str, app_id: &str, org_id: &str) -> String {
    let permission = config::config().security.admin_permission.clone();
    let claims = Claims::new(sub.into(), app_id.into(), org_id.into(), vec![permission]);
    generate_jwt(&claims).expect("token")
}

/// Asserts status and returns the `data` field of a success envelope
pub async fn data(resp: reqwest::Response, expected: StatusCode) -> Result<Value> {
    let status = resp.status();
    let body: Value = resp.json().await?;
    assert_eq!(status, expected, "unexpected status, body: {}", body);
    assert_eq!(body["success"], json!(true), "success flag false or missing: {}", body);
    Ok(body["data"].clone())
}

/// Asserts status and returns the error `code`
pub async fn error_code(resp: reqwest::Response, expected: StatusCode) -> Result<String> {
    let status = resp.status();
    let body: Value = resp.json().await?;
    assert_eq!(status, expected, "unexpected status, body: {}", body);
    assert_eq!(body["error"], json!(true), "error flag missing: {}", body);
    Ok(body["code"].as_str().unwrap_or_default().to_string())
}
