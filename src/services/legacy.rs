//! Student guides and health locations: schemaless documents keyed by `_id`
//! and always scoped to one `(app_id, org_id)` pair.

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use super::content::ContentError;
use crate::models::Document;
use crate::store::content::LegacyCollection;
use crate::store::ContentStore;

#[derive(Clone)]
pub struct LegacyService {
    store: Arc<ContentStore>,
}

fn entity(collection: LegacyCollection) -> &'static str {
    match collection {
        LegacyCollection::StudentGuides => "student guide",
        LegacyCollection::HealthLocations => "health location",
    }
}

fn persistence(action: &'static str, collection: LegacyCollection) -> impl FnOnce(crate::store::StoreError) -> ContentError {
    move |source| ContentError::Persistence { action, entity: entity(collection), source }
}

/// Reads a client supplied `_id`, which must be a string when present
fn body_id(collection: LegacyCollection, doc: &Document) -> Result<Option<String>, ContentError> {
    match doc.get("_id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id.clone())),
        Some(other) => Err(ContentError::PreconditionFailed(format!(
            "{} _id must be a string, got {}",
            entity(collection),
            other
        ))),
    }
}

fn stamp(doc: &mut Document, id: &str, app_id: &str, org_id: &str) {
    doc.insert("_id".to_string(), json!(id));
    doc.insert("app_id".to_string(), json!(app_id));
    doc.insert("org_id".to_string(), json!(org_id));
}

impl LegacyService {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, collection: LegacyCollection, app_id: &str, org_id: &str, ids: Option<&[String]>) -> Result<Vec<Document>, ContentError> {
        self.store
            .find_legacy(collection, app_id, org_id, ids)
            .await
            .map_err(persistence("list", collection))
    }

    pub async fn get(&self, collection: LegacyCollection, app_id: &str, org_id: &str, id: &str) -> Result<Document, ContentError> {
        self.store
            .find_legacy_one(collection, app_id, org_id, id)
            .await
            .map_err(persistence("get", collection))?
            .ok_or_else(|| ContentError::NotFound(format!("{} {}", entity(collection), id)))
    }

    /// Store a new document, generating `_id` when the client did not send one.
    /// The tenant fields always come from the caller, never the body.
    pub async fn create(&self, collection: LegacyCollection, app_id: &str, org_id: &str, mut doc: Document) -> Result<Document, ContentError> {
        let id = match body_id(collection, &doc)? {
            Some(id) => {
                let existing = self
                    .store
                    .find_legacy_one(collection, app_id, org_id, &id)
                    .await
                    .map_err(persistence("get", collection))?;
                if existing.is_some() {
                    return Err(ContentError::PreconditionFailed(format!("{} {} already exists", entity(collection), id)));
                }
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        stamp(&mut doc, &id, app_id, org_id);
        self.store
            .insert_legacy(collection, doc.clone())
            .await
            .map_err(persistence("create", collection))?;
        Ok(doc)
    }

    pub async fn replace(&self, collection: LegacyCollection, app_id: &str, org_id: &str, id: &str, mut doc: Document) -> Result<Document, ContentError> {
        if let Some(body_id) = body_id(collection, &doc)? {
            if body_id != id {
                return Err(ContentError::PreconditionFailed(format!(
                    "Body _id {} does not match {} {}",
                    body_id,
                    entity(collection),
                    id
                )));
            }
        }

        stamp(&mut doc, id, app_id, org_id);
        let matched = self
            .store
            .replace_legacy(collection, app_id, org_id, id, doc.clone())
            .await
            .map_err(persistence("update", collection))?;
        if matched == 0 {
            return Err(ContentError::NotFound(format!("{} {}", entity(collection), id)));
        }
        Ok(doc)
    }

    pub async fn delete(&self, collection: LegacyCollection, app_id: &str, org_id: &str, id: &str) -> Result<(), ContentError> {
        let deleted = self
            .store
            .delete_legacy(collection, app_id, org_id, id)
            .await
            .map_err(persistence("delete", collection))?;
        if deleted != 1 {
            return Err(ContentError::PreconditionFailed(format!(
                "Expected to delete exactly one {} {}, matched {}",
                entity(collection),
                id,
                deleted
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::legacy_service;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_generates_id_and_stamps_tenant() {
        let service = legacy_service();
        let created = service
            .create(LegacyCollection::StudentGuides, "app1", "org1", doc(json!({"title": "Welcome", "org_id": "spoofed"})))
            .await
            .unwrap();
        let id = created["_id"].as_str().unwrap().to_string();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(created["org_id"], json!("org1"));
        assert_eq!(created["app_id"], json!("app1"));

        let fetched = service.get(LegacyCollection::StudentGuides, "app1", "org1", &id).await.unwrap();
        assert_eq!(fetched["title"], json!("Welcome"));
        assert!(service.get(LegacyCollection::StudentGuides, "app1", "org2", &id).await.is_err());
    }

    #[tokio::test]
    async fn client_ids_must_be_unique_strings() {
        let service = legacy_service();
        let loc = doc(json!({"_id": "clinic", "name": "Clinic"}));
        service.create(LegacyCollection::HealthLocations, "app1", "org1", loc.clone()).await.unwrap();
        assert!(matches!(
            service.create(LegacyCollection::HealthLocations, "app1", "org1", loc).await,
            Err(ContentError::PreconditionFailed(_))
        ));
        assert!(matches!(
            service.create(LegacyCollection::HealthLocations, "app1", "org1", doc(json!({"_id": 7}))).await,
            Err(ContentError::PreconditionFailed(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_ids() {
        let service = legacy_service();
        for id in ["a", "b", "c"] {
            service.create(LegacyCollection::StudentGuides, "app1", "org1", doc(json!({"_id": id}))).await.unwrap();
        }
        let ids = vec!["a".to_string(), "c".to_string()];
        let found = service.list(LegacyCollection::StudentGuides, "app1", "org1", Some(&ids)).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(service.list(LegacyCollection::StudentGuides, "app1", "org1", None).await.unwrap().len(), 3);
        assert!(service.list(LegacyCollection::StudentGuides, "app2", "org1", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_and_delete() {
        let service = legacy_service();
        service.create(LegacyCollection::StudentGuides, "app1", "org1", doc(json!({"_id": "g", "v": 1}))).await.unwrap();

        let replaced = service
            .replace(LegacyCollection::StudentGuides, "app1", "org1", "g", doc(json!({"v": 2})))
            .await
            .unwrap();
        assert_eq!(replaced["v"], json!(2));
        assert_eq!(replaced["_id"], json!("g"));

        assert!(matches!(
            service.replace(LegacyCollection::StudentGuides, "app1", "org1", "g", doc(json!({"_id": "h"}))).await,
            Err(ContentError::PreconditionFailed(_))
        ));
        assert!(matches!(
            service.replace(LegacyCollection::StudentGuides, "app1", "org1", "missing", doc(json!({}))).await,
            Err(ContentError::NotFound(_))
        ));

        service.delete(LegacyCollection::StudentGuides, "app1", "org1", "g").await.unwrap();
        assert!(matches!(
            service.delete(LegacyCollection::StudentGuides, "app1", "org1", "g").await,
            Err(ContentError::PreconditionFailed(_))
        ));
    }
}
