//! Tenant-scoped persistence for content records.
//!
//! Every method that reads or mutates tenant data takes the resolved
//! [`AppScope`] and the organization id and folds them into the filter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use super::{perform_transaction, Collection, DocumentStore, ReplaceResult, StoreError};
use crate::filter::FilterData;
use crate::models::{from_document, timestamp, to_document, Category, ContentItem, DataContentItem, Document};
use crate::types::AppScope;

/// Listing options for content items
#[derive(Debug, Clone, Default)]
pub struct ContentItemQuery {
    pub ids: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// `"desc"` sorts newest first; anything else oldest first
    pub order: Option<String>,
}

/// Collections that predate the nullable-app convention and are scoped by an
/// explicit `(app_id, org_id)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyCollection {
    StudentGuides,
    HealthLocations,
}

impl LegacyCollection {
    pub fn collection(&self) -> Collection {
        match self {
            LegacyCollection::StudentGuides => Collection::StudentGuides,
            LegacyCollection::HealthLocations => Collection::HealthLocations,
        }
    }
}

/// Outcome of a write that must touch exactly one document
enum ExactWrite {
    Store(StoreError),
    Count(u64),
}

impl From<StoreError> for ExactWrite {
    fn from(err: StoreError) -> Self {
        ExactWrite::Store(err)
    }
}

pub struct ContentStore {
    documents: Arc<dyn DocumentStore>,
}

impl ContentStore {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.documents.ping().await
    }

    // Content items

    pub async fn find_content_categories(&self, scope: &AppScope, org_id: &str) -> Result<Vec<String>, StoreError> {
        let filter = Value::Object(scope.filter(org_id));
        let values = self.documents.distinct(Collection::ContentItems, "category", filter).await?;
        Ok(values.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
    }

    pub async fn find_content_items(&self, scope: &AppScope, org_id: &str, query: &ContentItemQuery) -> Result<Vec<ContentItem>, StoreError> {
        let mut filter = scope.filter(org_id);
        if let Some(ids) = &query.ids {
            filter.insert("id".to_string(), json!({ "$in": ids }));
        }
        if let Some(categories) = &query.categories {
            filter.insert("category".to_string(), json!({ "$in": categories }));
        }
        let direction = match query.order.as_deref() {
            Some(order) if order.eq_ignore_ascii_case("desc") => "desc",
            _ => "asc",
        };
        let query = FilterData {
            where_clause: Some(Value::Object(filter)),
            order: Some(json!({ "date_created": direction })),
            limit: query.limit,
            offset: query.offset,
        };
        self.find_typed(Collection::ContentItems, query).await
    }

    pub async fn find_content_item(&self, scope: &AppScope, org_id: &str, id: &str) -> Result<Vec<ContentItem>, StoreError> {
        let mut filter = scope.filter(org_id);
        filter.insert("id".to_string(), json!(id));
        self.find_typed(Collection::ContentItems, FilterData::matching(Value::Object(filter))).await
    }

    pub async fn find_content_item_in_category(&self, scope: &AppScope, org_id: &str, id: &str, category: &str) -> Result<Vec<ContentItem>, StoreError> {
        let mut filter = scope.filter(org_id);
        filter.insert("id".to_string(), json!(id));
        filter.insert("category".to_string(), json!(category));
        self.find_typed(Collection::ContentItems, FilterData::matching(Value::Object(filter))).await
    }

    pub async fn insert_content_item(&self, item: &ContentItem) -> Result<(), StoreError> {
        self.documents.insert_one(Collection::ContentItems, to_document(item)?).await
    }

    /// Overwrite category and data. Returns the matched count; anything but
    /// one is rolled back.
    pub async fn update_content_item(
        &self,
        scope: &AppScope,
        org_id: &str,
        id: &str,
        category: &str,
        data: &Value,
        date_updated: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut filter = scope.filter(org_id);
        filter.insert("id".to_string(), json!(id));
        let mut set = Map::new();
        set.insert("category".to_string(), json!(category));
        set.insert("data".to_string(), data.clone());
        set.insert("date_updated".to_string(), json!(timestamp::format(&date_updated)));
        self.update_exactly_one(Collection::ContentItems, Value::Object(filter), set).await
    }

    /// Replace the whole stored item, inserting it when absent. Keyed by
    /// `(org_id, id)` plus the item's own app_id when it has one.
    pub async fn save_content_item(&self, item: &ContentItem) -> Result<ReplaceResult, StoreError> {
        let mut filter = Map::new();
        filter.insert("org_id".to_string(), json!(item.org_id));
        filter.insert("id".to_string(), json!(item.id));
        if let Some(app_id) = &item.app_id {
            filter.insert("app_id".to_string(), json!(app_id));
        }
        self.documents
            .replace_one(Collection::ContentItems, Value::Object(filter), to_document(item)?, true)
            .await
    }

    /// Returns how many documents matched. Anything but one is rolled back.
    pub async fn delete_content_item(&self, scope: &AppScope, org_id: &str, id: &str) -> Result<u64, StoreError> {
        let mut filter = scope.filter(org_id);
        filter.insert("id".to_string(), json!(id));
        self.delete_exactly_one(Collection::ContentItems, Value::Object(filter)).await
    }

    // Categories

    pub async fn find_category(&self, scope: &AppScope, org_id: &str, name: &str) -> Result<Option<Category>, StoreError> {
        let mut filter = scope.filter(org_id);
        filter.insert("name".to_string(), json!(name));
        Ok(self.find_typed(Collection::Categories, FilterData::matching(Value::Object(filter))).await?.into_iter().next())
    }

    pub async fn find_categories(&self, scope: &AppScope, org_id: &str) -> Result<Vec<Category>, StoreError> {
        let query = FilterData {
            where_clause: Some(Value::Object(scope.filter(org_id))),
            order: Some(json!({ "name": "asc" })),
            ..Default::default()
        };
        self.find_typed(Collection::Categories, query).await
    }

    pub async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        self.documents.insert_one(Collection::Categories, to_document(category)?).await
    }

    pub async fn update_category(
        &self,
        scope: &AppScope,
        org_id: &str,
        name: &str,
        permissions: &[String],
        date_updated: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut filter = scope.filter(org_id);
        filter.insert("name".to_string(), json!(name));
        let mut set = Map::new();
        set.insert("permissions".to_string(), json!(permissions));
        set.insert("date_updated".to_string(), json!(timestamp::format(&date_updated)));
        self.update_exactly_one(Collection::Categories, Value::Object(filter), set).await
    }

    pub async fn delete_category(&self, scope: &AppScope, org_id: &str, name: &str) -> Result<u64, StoreError> {
        let mut filter = scope.filter(org_id);
        filter.insert("name".to_string(), json!(name));
        self.delete_exactly_one(Collection::Categories, Value::Object(filter)).await
    }

    // Data content items

    pub async fn find_data_item(&self, scope: &AppScope, org_id: &str, key: &str) -> Result<Option<DataContentItem>, StoreError> {
        let mut filter = scope.filter(org_id);
        filter.insert("key".to_string(), json!(key));
        Ok(self.find_typed(Collection::DataContentItems, FilterData::matching(Value::Object(filter))).await?.into_iter().next())
    }

    pub async fn find_data_items(&self, scope: &AppScope, org_id: &str, category: Option<&str>) -> Result<Vec<DataContentItem>, StoreError> {
        let mut filter = scope.filter(org_id);
        if let Some(category) = category {
            filter.insert("category".to_string(), json!(category));
        }
        let query = FilterData {
            where_clause: Some(Value::Object(filter)),
            order: Some(json!({ "key": "asc" })),
            ..Default::default()
        };
        self.find_typed(Collection::DataContentItems, query).await
    }

    pub async fn insert_data_item(&self, item: &DataContentItem) -> Result<(), StoreError> {
        self.documents.insert_one(Collection::DataContentItems, to_document(item)?).await
    }

    pub async fn update_data_item(
        &self,
        scope: &AppScope,
        org_id: &str,
        key: &str,
        category: &str,
        data: &Value,
        date_updated: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut filter = scope.filter(org_id);
        filter.insert("key".to_string(), json!(key));
        let mut set = Map::new();
        set.insert("category".to_string(), json!(category));
        set.insert("data".to_string(), data.clone());
        set.insert("date_updated".to_string(), json!(timestamp::format(&date_updated)));
        self.update_exactly_one(Collection::DataContentItems, Value::Object(filter), set).await
    }

    pub async fn delete_data_item(&self, scope: &AppScope, org_id: &str, key: &str) -> Result<u64, StoreError> {
        let mut filter = scope.filter(org_id);
        filter.insert("key".to_string(), json!(key));
        self.delete_exactly_one(Collection::DataContentItems, Value::Object(filter)).await
    }

    // Legacy collections

    pub async fn find_legacy(&self, collection: LegacyCollection, app_id: &str, org_id: &str, ids: Option<&[String]>) -> Result<Vec<Document>, StoreError> {
        let mut filter = legacy_filter(app_id, org_id);
        if let Some(ids) = ids {
            filter.insert("_id".to_string(), json!({ "$in": ids }));
        }
        self.documents.find(collection.collection(), FilterData::matching(Value::Object(filter))).await
    }

    pub async fn find_legacy_one(&self, collection: LegacyCollection, app_id: &str, org_id: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let mut filter = legacy_filter(app_id, org_id);
        filter.insert("_id".to_string(), json!(id));
        self.documents.find_one(collection.collection(), Value::Object(filter)).await
    }

    pub async fn insert_legacy(&self, collection: LegacyCollection, doc: Document) -> Result<(), StoreError> {
        self.documents.insert_one(collection.collection(), doc).await
    }

    pub async fn replace_legacy(&self, collection: LegacyCollection, app_id: &str, org_id: &str, id: &str, doc: Document) -> Result<u64, StoreError> {
        let mut filter = legacy_filter(app_id, org_id);
        filter.insert("_id".to_string(), json!(id));
        let result = self.documents.replace_one(collection.collection(), Value::Object(filter), doc, false).await?;
        Ok(result.matched)
    }

    pub async fn delete_legacy(&self, collection: LegacyCollection, app_id: &str, org_id: &str, id: &str) -> Result<u64, StoreError> {
        let mut filter = legacy_filter(app_id, org_id);
        filter.insert("_id".to_string(), json!(id));
        self.delete_exactly_one(collection.collection(), Value::Object(filter)).await
    }

    async fn find_typed<T: serde::de::DeserializeOwned>(&self, collection: Collection, query: FilterData) -> Result<Vec<T>, StoreError> {
        let docs = self.documents.find(collection, query).await?;
        docs.into_iter()
            .map(|doc| from_document(doc).map_err(StoreError::from))
            .collect()
    }

    /// Update inside a transaction that only commits when exactly one
    /// document matched; returns the matched count either way
    async fn update_exactly_one(&self, collection: Collection, filter: Value, set: Document) -> Result<u64, StoreError> {
        let result: Result<u64, ExactWrite> = perform_transaction(self.documents.as_ref(), move |session| {
            Box::pin(async move {
                let matched = session.update_many(collection, filter, set).await?;
                if matched == 1 {
                    Ok(matched)
                } else {
                    Err(ExactWrite::Count(matched))
                }
            })
        })
        .await;
        exact_count(result)
    }

    async fn delete_exactly_one(&self, collection: Collection, filter: Value) -> Result<u64, StoreError> {
        let result: Result<u64, ExactWrite> = perform_transaction(self.documents.as_ref(), move |session| {
            Box::pin(async move {
                let deleted = session.delete_many(collection, filter).await?;
                if deleted == 1 {
                    Ok(deleted)
                } else {
                    Err(ExactWrite::Count(deleted))
                }
            })
        })
        .await;
        exact_count(result)
    }
}

fn exact_count(result: Result<u64, ExactWrite>) -> Result<u64, StoreError> {
    match result {
        Ok(count) | Err(ExactWrite::Count(count)) => Ok(count),
        Err(ExactWrite::Store(err)) => Err(err),
    }
}

fn legacy_filter(app_id: &str, org_id: &str) -> Map<String, Value> {
    let mut filter = Map::new();
    filter.insert("app_id".to_string(), json!(app_id));
    filter.insert("org_id".to_string(), json!(org_id));
    filter
}
