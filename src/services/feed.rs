//! Cached proxy for the third-party social feed.
//!
//! Lookups that hit a live entry never touch the refresh lock. Misses and
//! forced refreshes serialize on one process-wide lock and re-check the cache
//! after acquiring it, so a burst of identical misses reaches the upstream
//! once. The lock is shared by every key: unrelated misses also wait on each
//! other.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::config::FeedConfig;

/// Query parameter that bypasses the cache; never forwarded upstream
pub const FORCE_PARAM: &str = "force";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Feed request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Feed response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid feed base URL: {0}")]
    InvalidBaseUrl(String),
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, subject: &str, query: &str) -> Result<Value, FeedError>;
}

/// `GET {base_url}/users/{subject}/tweets?{query}` with a bearer token
pub struct HttpFeedClient {
    client: reqwest::Client,
    base_url: Url,
    bearer_token: String,
}

impl HttpFeedClient {
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| FeedError::InvalidBaseUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(FeedError::InvalidBaseUrl(config.base_url.clone()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url,
            bearer_token: config.bearer_token.clone(),
        })
    }

    fn tweets_url(&self, subject: &str, query: &str) -> Result<Url, FeedError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FeedError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["users", subject, "tweets"]);
        url.set_query(if query.is_empty() { None } else { Some(query) });
        Ok(url)
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch(&self, subject: &str, query: &str) -> Result<Value, FeedError> {
        let url = self.tweets_url(subject, query)?;
        debug!("Fetching feed {}", url);

        let response = self.client.get(url).bearer_auth(&self.bearer_token).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FeedError::Upstream { status: status.as_u16(), body });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Splits the service-level `force` flag out of a raw query string. The
/// remaining pairs keep their original encoding and order.
pub fn split_force(raw_query: &str) -> (String, bool) {
    let mut force = false;
    let mut kept = vec![];
    for pair in raw_query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = match url::form_urlencoded::parse(pair.as_bytes()).next() {
            Some((k, v)) => (k.into_owned(), v.into_owned()),
            None => continue,
        };
        if key == FORCE_PARAM {
            force = value.is_empty() || value == "true" || value == "1";
        } else {
            kept.push(pair);
        }
    }
    (kept.join("&"), force)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FeedKey {
    subject: String,
    query: String,
}

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

pub struct FeedCache {
    source: Arc<dyn FeedSource>,
    entries: RwLock<HashMap<FeedKey, CacheEntry>>,
    refresh: Mutex<()>,
    ttl: Duration,
}

impl FeedCache {
    pub fn new(source: Arc<dyn FeedSource>, ttl: Duration) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
            refresh: Mutex::new(()),
            ttl,
        }
    }

    pub fn from_config(source: Arc<dyn FeedSource>, config: &FeedConfig) -> Self {
        Self::new(source, Duration::from_secs(config.cache_ttl_secs))
    }

    /// Feed for `subject`, where `raw_query` is the request's query string
    /// (the `force` flag included)
    pub async fn get(&self, subject: &str, raw_query: &str) -> Result<Value, FeedError> {
        let (query, force) = split_force(raw_query);
        let key = FeedKey { subject: subject.to_string(), query };

        if !force {
            if let Some(value) = self.lookup(&key) {
                debug!("Feed cache hit for {}", key.subject);
                return Ok(value);
            }
        }

        let _refresh = self.refresh.lock().await;
        if force {
            self.evict(&key);
        } else if let Some(value) = self.lookup(&key) {
            debug!("Feed cache filled while waiting for {}", key.subject);
            return Ok(value);
        }

        debug!("Feed cache miss for {} (forced: {})", key.subject, force);
        let value = self.source.fetch(&key.subject, &key.query).await?;
        self.write_entries().insert(key, CacheEntry { value: value.clone(), stored_at: Instant::now() });
        debug!("Feed cache holds {} entries", self.len());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &FeedKey) -> Option<Value> {
        {
            let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.stored_at.elapsed() < self.ttl => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }
        self.evict_expired(key);
        None
    }

    /// Re-checks under the write lock: a refresher may have stored a fresh
    /// entry since the read lock was released
    fn evict_expired(&self, key: &FeedKey) {
        let mut entries = self.write_entries();
        if entries.get(key).is_some_and(|entry| entry.stored_at.elapsed() >= self.ttl) {
            entries.remove(key);
        }
    }

    fn evict(&self, key: &FeedKey) {
        self.write_entries().remove(key);
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<FeedKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
