//! Document store contract and its backends.
//!
//! `DocumentStore` is the raw, unscoped collection API. Request handling never
//! talks to it directly: it goes through [`content::ContentStore`], which
//! applies the tenant filter to every call. Only the startup backfill uses the
//! raw contract.

pub mod content;
pub mod memory;
pub mod postgres;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::filter::{FilterData, FilterError};
use crate::models::Document;

pub use content::ContentStore;
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    ContentItems,
    Categories,
    DataContentItems,
    StudentGuides,
    HealthLocations,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::ContentItems,
        Collection::Categories,
        Collection::DataContentItems,
        Collection::StudentGuides,
        Collection::HealthLocations,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::ContentItems => "content_items",
            Collection::Categories => "categories",
            Collection::DataContentItems => "data_content_items",
            Collection::StudentGuides => "student_guides",
            Collection::HealthLocations => "health_locations",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from document store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored document in {0} is not an object")]
    InvalidDocument(Collection),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Write to {0} rejected")]
    WriteRejected(Collection),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceResult {
    pub matched: u64,
    pub upserted: bool,
}

/// Shared, unscoped access to every collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: Collection, query: FilterData) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, collection: Collection, filter: Value) -> Result<Option<Document>, StoreError> {
        let query = FilterData { limit: Some(1), ..FilterData::matching(filter) };
        Ok(self.find(collection, query).await?.into_iter().next())
    }

    async fn insert_one(&self, collection: Collection, doc: Document) -> Result<(), StoreError>;

    /// Replace the first document matching `filter`; insert `doc` when nothing
    /// matches and `upsert` is set
    async fn replace_one(&self, collection: Collection, filter: Value, doc: Document, upsert: bool) -> Result<ReplaceResult, StoreError>;

    /// Merge the top-level fields of `set` into every matching document
    async fn update_many(&self, collection: Collection, filter: Value, set: Document) -> Result<u64, StoreError>;

    async fn delete_many(&self, collection: Collection, filter: Value) -> Result<u64, StoreError>;

    async fn distinct(&self, collection: Collection, field: &str, filter: Value) -> Result<Vec<Value>, StoreError>;

    /// Open a transactional session. Dropping it without `commit` rolls back.
    async fn begin(&self) -> Result<Box<dyn DocumentSession>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// The same operations bound to one transaction
#[async_trait]
pub trait DocumentSession: Send {
    async fn find(&mut self, collection: Collection, query: FilterData) -> Result<Vec<Document>, StoreError>;

    async fn insert_one(&mut self, collection: Collection, doc: Document) -> Result<(), StoreError>;

    async fn replace_one(&mut self, collection: Collection, filter: Value, doc: Document, upsert: bool) -> Result<ReplaceResult, StoreError>;

    async fn update_many(&mut self, collection: Collection, filter: Value, set: Document) -> Result<u64, StoreError>;

    async fn delete_many(&mut self, collection: Collection, filter: Value) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn abort(self: Box<Self>) -> Result<(), StoreError>;
}

/// Run `f` inside one transaction: commit when it returns `Ok`, abort otherwise.
/// The session is released on every path.
pub async fn perform_transaction<T, E, F>(store: &dyn DocumentStore, f: F) -> Result<T, E>
where
    F: for<'s> FnOnce(&'s mut (dyn DocumentSession + 'static)) -> BoxFuture<'s, Result<T, E>>,
    E: From<StoreError>,
{
    let mut session = store.begin().await?;
    let result = f(session.as_mut()).await;
    match result {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(abort_err) = session.abort().await {
                tracing::warn!("Transaction abort failed: {}", abort_err);
            }
            Err(err)
        }
    }
}
