//! Fixtures shared by unit tests: in-memory services and scriptable fakes.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::services::assets::{AssetError, ImageResizer};
use crate::services::feed::{FeedError, FeedSource};
use crate::services::{ContentService, LegacyService};
use crate::storage::{LocalObjectStore, ObjectStore};
use crate::store::{ContentStore, MemoryDocumentStore};
use crate::types::AppScope;

pub fn app(app_id: &str) -> AppScope {
    AppScope::Scoped(app_id.to_string())
}

/// Content service over a fresh memory store; the raw store is returned for
/// fault injection and unscoped assertions
pub fn content_service() -> (Arc<MemoryDocumentStore>, ContentService) {
    let docs = Arc::new(MemoryDocumentStore::new());
    let store = Arc::new(ContentStore::new(docs.clone()));
    (docs, ContentService::new(store))
}

pub fn legacy_service() -> LegacyService {
    let docs = Arc::new(MemoryDocumentStore::new());
    LegacyService::new(Arc::new(ContentStore::new(docs)))
}

/// Local object store in a unique temp directory; the caller removes the root
pub fn temp_object_store() -> (Arc<dyn ObjectStore>, PathBuf) {
    let root = std::env::temp_dir().join(format!("content-api-test-{}", Uuid::new_v4().simple()));
    (Arc::new(LocalObjectStore::new(&root, "http://assets.test")), root)
}

/// Feed source with a swappable response, an optional delay, and a call count
pub struct FakeFeed {
    calls: AtomicUsize,
    response: Mutex<Result<Value, u16>>,
    delay: Duration,
}

impl FakeFeed {
    pub fn new(payload: Value) -> Self {
        Self::with_delay(payload, Duration::ZERO)
    }

    pub fn with_delay(payload: Value, delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Mutex::new(Ok(payload)),
            delay,
        }
    }

    pub fn respond_with(&self, payload: Value) {
        *self.response.lock().unwrap() = Ok(payload);
    }

    pub fn fail_with(&self, status: u16) {
        *self.response.lock().unwrap() = Err(status);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch(&self, _subject: &str, _query: &str) -> Result<Value, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = self.response.lock().unwrap().clone();
        response.map_err(|status| FeedError::Upstream { status, body: "scripted failure".to_string() })
    }
}

/// Tags output with the requested dimension and remembers each request
#[derive(Default)]
pub struct RecordingResizer {
    requested: Mutex<Vec<u32>>,
}

impl RecordingResizer {
    pub fn dimensions(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

impl ImageResizer for RecordingResizer {
    fn resize(&self, bytes: &[u8], max_dimension: u32) -> Result<Vec<u8>, AssetError> {
        self.requested.lock().unwrap().push(max_dimension);
        let mut out = bytes.to_vec();
        out.extend_from_slice(format!("@{}", max_dimension).as_bytes());
        Ok(out)
    }
}
