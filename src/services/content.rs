use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::{timestamp, Category, ContentItem, ContentItemInput, DataContentItem, DataContentItemInput};
use crate::store::content::ContentItemQuery;
use crate::store::{ContentStore, StoreError};
use crate::types::AppScope;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Failed to {action} {entity}: {source}")]
    Persistence {
        action: &'static str,
        entity: &'static str,
        #[source]
        source: StoreError,
    },
}

fn persistence(action: &'static str, entity: &'static str) -> impl FnOnce(StoreError) -> ContentError {
    move |source| ContentError::Persistence { action, entity, source }
}

/// Exactly one element, or `NotFound` naming what was looked up
fn single<T>(mut found: Vec<T>, what: impl FnOnce() -> String) -> Result<T, ContentError> {
    if found.len() == 1 {
        Ok(found.remove(0))
    } else {
        Err(ContentError::NotFound(what()))
    }
}

/// A write that matched nothing is `NotFound`; one that matched several
/// records was rolled back and is a precondition failure
fn exactly_one_match(matched: u64, what: impl FnOnce() -> String) -> Result<(), ContentError> {
    match matched {
        1 => Ok(()),
        0 => Err(ContentError::NotFound(what())),
        n => Err(ContentError::PreconditionFailed(format!("{} matched {} records", what(), n))),
    }
}

/// Content items, categories and key/value data items. Every operation takes
/// the scope already resolved for the request.
#[derive(Clone)]
pub struct ContentService {
    store: Arc<ContentStore>,
}

impl ContentService {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    pub async fn list_categories(&self, scope: &AppScope, org_id: &str) -> Result<Vec<String>, ContentError> {
        self.store
            .find_content_categories(scope, org_id)
            .await
            .map_err(persistence("list", "content categories"))
    }

    pub async fn list_items(&self, scope: &AppScope, org_id: &str, query: &ContentItemQuery) -> Result<Vec<ContentItem>, ContentError> {
        self.store
            .find_content_items(scope, org_id, query)
            .await
            .map_err(persistence("list", "content items"))
    }

    pub async fn get_item(&self, scope: &AppScope, org_id: &str, id: &str) -> Result<ContentItem, ContentError> {
        let found = self
            .store
            .find_content_item(scope, org_id, id)
            .await
            .map_err(persistence("get", "content item"))?;
        single(found, || format!("Content item {}", id))
    }

    pub async fn create_item(&self, scope: &AppScope, org_id: &str, category: String, data: Value) -> Result<ContentItem, ContentError> {
        let item = ContentItem::new(scope, org_id, category, data);
        self.store
            .insert_content_item(&item)
            .await
            .map_err(persistence("create", "content item"))?;
        debug!("Created content item {} in {}", item.id, item.category);
        Ok(item)
    }

    pub async fn update_item(&self, scope: &AppScope, org_id: &str, id: &str, input: ContentItemInput) -> Result<ContentItem, ContentError> {
        if let Some(body_id) = input.id.as_deref() {
            if body_id != id {
                return Err(ContentError::PreconditionFailed(format!(
                    "Body id {} does not match content item {}",
                    body_id, id
                )));
            }
        }

        let matched = self
            .store
            .update_content_item(scope, org_id, id, &input.category, &input.data, timestamp::now())
            .await
            .map_err(persistence("update", "content item"))?;
        exactly_one_match(matched, || format!("Content item {}", id))?;

        let found = self
            .store
            .find_content_item(scope, org_id, id)
            .await
            .map_err(persistence("get", "content item"))?;
        found
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::NotFound(format!("Content item {}", id)))
    }

    /// Replace only `data`. The read and the write are separate store calls, so
    /// two concurrent patches of the same item resolve to whichever wrote last.
    pub async fn update_item_data(&self, scope: &AppScope, org_id: &str, id: &str, category: &str, data: Value) -> Result<ContentItem, ContentError> {
        let found = self
            .store
            .find_content_item_in_category(scope, org_id, id, category)
            .await
            .map_err(persistence("get", "content item"))?;
        let mut item = single(found, || format!("Content item {} in category {}", id, category))?;

        item.data = data;
        item.date_updated = Some(timestamp::now());
        self.store
            .save_content_item(&item)
            .await
            .map_err(persistence("update", "content item"))?;
        Ok(item)
    }

    pub async fn delete_item(&self, scope: &AppScope, org_id: &str, id: &str) -> Result<(), ContentError> {
        let deleted = self
            .store
            .delete_content_item(scope, org_id, id)
            .await
            .map_err(persistence("delete", "content item"))?;
        if deleted != 1 {
            return Err(ContentError::PreconditionFailed(format!(
                "Expected to delete exactly one content item {}, matched {}",
                id, deleted
            )));
        }
        Ok(())
    }

    pub async fn delete_item_in_category(&self, scope: &AppScope, org_id: &str, id: &str, category: &str) -> Result<(), ContentError> {
        let found = self
            .store
            .find_content_item_in_category(scope, org_id, id, category)
            .await
            .map_err(persistence("get", "content item"))?;
        single(found, || format!("Content item {} in category {}", id, category))?;
        self.delete_item(scope, org_id, id).await
    }

    // Categories

    pub async fn create_category(&self, scope: &AppScope, org_id: &str, name: String, permissions: Vec<String>) -> Result<Category, ContentError> {
        let existing = self
            .store
            .find_category(scope, org_id, &name)
            .await
            .map_err(persistence("get", "category"))?;
        if existing.is_some() {
            return Err(ContentError::PreconditionFailed(format!("Category {} already exists", name)));
        }

        let category = Category::new(scope, org_id, name, permissions);
        self.store
            .insert_category(&category)
            .await
            .map_err(persistence("create", "category"))?;
        Ok(category)
    }

    pub async fn get_category(&self, scope: &AppScope, org_id: &str, name: &str) -> Result<Category, ContentError> {
        self.store
            .find_category(scope, org_id, name)
            .await
            .map_err(persistence("get", "category"))?
            .ok_or_else(|| ContentError::NotFound(format!("Category {}", name)))
    }

    pub async fn list_category_records(&self, scope: &AppScope, org_id: &str) -> Result<Vec<Category>, ContentError> {
        self.store
            .find_categories(scope, org_id)
            .await
            .map_err(persistence("list", "categories"))
    }

    pub async fn update_category(&self, scope: &AppScope, org_id: &str, name: &str, permissions: Vec<String>) -> Result<Category, ContentError> {
        let matched = self
            .store
            .update_category(scope, org_id, name, &permissions, timestamp::now())
            .await
            .map_err(persistence("update", "category"))?;
        exactly_one_match(matched, || format!("Category {}", name))?;
        self.get_category(scope, org_id, name).await
    }

    pub async fn delete_category(&self, scope: &AppScope, org_id: &str, name: &str) -> Result<(), ContentError> {
        let deleted = self
            .store
            .delete_category(scope, org_id, name)
            .await
            .map_err(persistence("delete", "category"))?;
        if deleted != 1 {
            return Err(ContentError::PreconditionFailed(format!(
                "Expected to delete exactly one category {}, matched {}",
                name, deleted
            )));
        }
        Ok(())
    }

    // Data content items

    pub async fn create_data_item(&self, scope: &AppScope, org_id: &str, input: DataContentItemInput) -> Result<DataContentItem, ContentError> {
        let existing = self
            .store
            .find_data_item(scope, org_id, &input.key)
            .await
            .map_err(persistence("get", "data item"))?;
        if existing.is_some() {
            return Err(ContentError::PreconditionFailed(format!("Data item {} already exists", input.key)));
        }

        let item = DataContentItem::new(scope, org_id, input);
        self.store
            .insert_data_item(&item)
            .await
            .map_err(persistence("create", "data item"))?;
        Ok(item)
    }

    pub async fn get_data_item(&self, scope: &AppScope, org_id: &str, key: &str) -> Result<DataContentItem, ContentError> {
        self.store
            .find_data_item(scope, org_id, key)
            .await
            .map_err(persistence("get", "data item"))?
            .ok_or_else(|| ContentError::NotFound(format!("Data item {}", key)))
    }

    pub async fn list_data_items(&self, scope: &AppScope, org_id: &str, category: Option<&str>) -> Result<Vec<DataContentItem>, ContentError> {
        self.store
            .find_data_items(scope, org_id, category)
            .await
            .map_err(persistence("list", "data items"))
    }

    pub async fn update_data_item(&self, scope: &AppScope, org_id: &str, key: &str, input: DataContentItemInput) -> Result<DataContentItem, ContentError> {
        if input.key != key {
            return Err(ContentError::PreconditionFailed(format!(
                "Body key {} does not match data item {}",
                input.key, key
            )));
        }
        let matched = self
            .store
            .update_data_item(scope, org_id, key, &input.category, &input.data, timestamp::now())
            .await
            .map_err(persistence("update", "data item"))?;
        exactly_one_match(matched, || format!("Data item {}", key))?;
        self.get_data_item(scope, org_id, key).await
    }

    pub async fn delete_data_item(&self, scope: &AppScope, org_id: &str, key: &str) -> Result<(), ContentError> {
        let deleted = self
            .store
            .delete_data_item(scope, org_id, key)
            .await
            .map_err(persistence("delete", "data item"))?;
        if deleted != 1 {
            return Err(ContentError::PreconditionFailed(format!(
                "Expected to delete exactly one data item {}, matched {}",
                key, deleted
            )));
        }
        Ok(())
    }
}
