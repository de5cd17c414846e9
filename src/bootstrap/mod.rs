//! One-time tenant backfill for data written before records carried a tenant.
//!
//! Runs before the listener binds and is the only code that touches the
//! document store without a tenant filter. The first content item decides
//! whether the dataset has been migrated: if it has an `app_id` field (even a
//! null one) nothing happens. A dataset whose first item was migrated but whose
//! later items were not is not detected.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;
use crate::filter::FilterData;
use crate::store::{perform_transaction, Collection, DocumentStore, StoreError};

/// Migrated in this order inside one transaction
const BACKFILL_COLLECTIONS: [Collection; 3] = [
    Collection::ContentItems,
    Collection::HealthLocations,
    Collection::StudentGuides,
];

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("Tenant backfill failed: {0}")]
    Store(#[from] StoreError),

    #[error("Tenant backfill did not finish within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BackfillOutcome {
    AlreadyMigrated,
    /// Fresh deployment, no content items at all
    EmptyDataset,
    Migrated {
        content_items: u64,
        health_locations: u64,
        student_guides: u64,
    },
}

impl fmt::Display for BackfillOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackfillOutcome::AlreadyMigrated => write!(f, "already migrated"),
            BackfillOutcome::EmptyDataset => write!(f, "no content items, nothing to migrate"),
            BackfillOutcome::Migrated { content_items, health_locations, student_guides } => write!(
                f,
                "migrated {} content items, {} health locations, {} student guides",
                content_items, health_locations, student_guides
            ),
        }
    }
}

pub struct Backfill {
    store: Arc<dyn DocumentStore>,
    default_app_id: String,
    default_org_id: String,
    timeout: Duration,
}

impl Backfill {
    pub fn new(store: Arc<dyn DocumentStore>, default_app_id: impl Into<String>, default_org_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            default_app_id: default_app_id.into(),
            default_org_id: default_org_id.into(),
            timeout,
        }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        Self::new(
            store,
            config.tenancy.default_app_id.clone(),
            config.tenancy.default_org_id.clone(),
            config.database.migration_timeout(),
        )
    }

    pub async fn run(&self) -> Result<BackfillOutcome, BackfillError> {
        let mut defaults = Map::new();
        defaults.insert("app_id".to_string(), json!(self.default_app_id));
        defaults.insert("org_id".to_string(), json!(self.default_org_id));

        info!("Checking legacy data for tenant backfill");
        let migration = perform_transaction(self.store.as_ref(), move |session| {
            Box::pin(async move {
                let first = session
                    .find(Collection::ContentItems, FilterData { limit: Some(1), ..Default::default() })
                    .await?;
                let first = match first.into_iter().next() {
                    Some(doc) => doc,
                    None => return Ok::<_, BackfillError>(BackfillOutcome::EmptyDataset),
                };
                if first.contains_key("app_id") {
                    return Ok(BackfillOutcome::AlreadyMigrated);
                }

                let mut counts = [0u64; 3];
                for (count, collection) in counts.iter_mut().zip(BACKFILL_COLLECTIONS) {
                    *count = session
                        .update_many(collection, Value::Object(Map::new()), defaults.clone())
                        .await?;
                    info!("Backfilled {} documents in {}", count, collection);
                }
                let [content_items, health_locations, student_guides] = counts;
                Ok(BackfillOutcome::Migrated { content_items, health_locations, student_guides })
            })
        });

        let outcome = tokio::time::timeout(self.timeout, migration)
            .await
            .map_err(|_| BackfillError::Timeout(self.timeout))??;
        info!("Tenant backfill finished: {}", outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use crate::store::MemoryDocumentStore;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    fn backfill(store: &MemoryDocumentStore, timeout: Duration) -> Backfill {
        Backfill::new(Arc::new(store.clone()), "default-app", "default-org", timeout)
    }

    async fn seed_legacy(store: &MemoryDocumentStore) {
        store.insert_one(Collection::ContentItems, doc(json!({"id": "c1", "category": "faq"}))).await.unwrap();
        store.insert_one(Collection::ContentItems, doc(json!({"id": "c2", "category": "faq"}))).await.unwrap();
        store.insert_one(Collection::HealthLocations, doc(json!({"_id": "h1"}))).await.unwrap();
        store.insert_one(Collection::StudentGuides, doc(json!({"_id": "g1"}))).await.unwrap();
    }

    async fn all(store: &MemoryDocumentStore, collection: Collection) -> Vec<Document> {
        store.find(collection, FilterData::default()).await.unwrap()
    }

    #[tokio::test]
    async fn migrates_every_legacy_collection() {
        let store = MemoryDocumentStore::new();
        seed_legacy(&store).await;

        let outcome = backfill(&store, Duration::from_secs(5)).run().await.unwrap();
        assert_eq!(
            outcome,
            BackfillOutcome::Migrated { content_items: 2, health_locations: 1, student_guides: 1 }
        );
        for collection in BACKFILL_COLLECTIONS {
            for d in all(&store, collection).await {
                assert_eq!(d["app_id"], json!("default-app"));
                assert_eq!(d["org_id"], json!("default-org"));
            }
        }
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let store = MemoryDocumentStore::new();
        seed_legacy(&store).await;
        backfill(&store, Duration::from_secs(5)).run().await.unwrap();
        let before = all(&store, Collection::ContentItems).await;

        let outcome = backfill(&store, Duration::from_secs(5)).run().await.unwrap();
        assert_eq!(outcome, BackfillOutcome::AlreadyMigrated);
        assert_eq!(all(&store, Collection::ContentItems).await, before);
    }

    #[tokio::test]
    async fn null_app_id_counts_as_migrated() {
        let store = MemoryDocumentStore::new();
        store.insert_one(Collection::ContentItems, doc(json!({"id": "c1", "app_id": null, "org_id": "o"}))).await.unwrap();
        store.insert_one(Collection::StudentGuides, doc(json!({"_id": "g1"}))).await.unwrap();

        let outcome = backfill(&store, Duration::from_secs(5)).run().await.unwrap();
        assert_eq!(outcome, BackfillOutcome::AlreadyMigrated);
        assert!(!all(&store, Collection::StudentGuides).await[0].contains_key("app_id"));
    }

    #[tokio::test]
    async fn empty_dataset_needs_nothing() {
        let store = MemoryDocumentStore::new();
        store.insert_one(Collection::StudentGuides, doc(json!({"_id": "g1"}))).await.unwrap();
        let outcome = backfill(&store, Duration::from_secs(5)).run().await.unwrap();
        assert_eq!(outcome, BackfillOutcome::EmptyDataset);
    }

    #[tokio::test]
    async fn failure_in_last_collection_leaves_everything_untouched() {
        let store = MemoryDocumentStore::new();
        seed_legacy(&store).await;
        store.reject_writes(Collection::StudentGuides);

        let err = backfill(&store, Duration::from_secs(5)).run().await.unwrap_err();
        assert!(matches!(err, BackfillError::Store(StoreError::WriteRejected(Collection::StudentGuides))));
        for collection in BACKFILL_COLLECTIONS {
            for d in all(&store, collection).await {
                assert!(!d.contains_key("app_id"), "{} was partially migrated", collection);
            }
        }

        // A later run after the fault clears completes the migration
        store.accept_writes(Collection::StudentGuides);
        let outcome = backfill(&store, Duration::from_secs(5)).run().await.unwrap();
        assert!(matches!(outcome, BackfillOutcome::Migrated { .. }));
    }

    #[tokio::test]
    async fn times_out_when_the_store_is_held() {
        let store = MemoryDocumentStore::new();
        seed_legacy(&store).await;
        let held = store.begin().await.unwrap();

        let err = backfill(&store, Duration::from_millis(50)).run().await.unwrap_err();
        assert!(matches!(err, BackfillError::Timeout(_)));
        drop(held);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let value = serde_json::to_value(BackfillOutcome::Migrated { content_items: 1, health_locations: 0, student_guides: 2 }).unwrap();
        assert_eq!(value, json!({"outcome": "migrated", "content_items": 1, "health_locations": 0, "student_guides": 2}));
        assert_eq!(serde_json::to_value(BackfillOutcome::AlreadyMigrated).unwrap(), json!({"outcome": "already_migrated"}));
    }
}
