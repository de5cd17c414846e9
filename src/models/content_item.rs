use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::timestamp;
use crate::types::AppScope;

/// Generic schema-flexible content record. `data` is opaque to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub category: String,
    #[serde(with = "timestamp")]
    pub date_created: DateTime<Utc>,
    #[serde(with = "timestamp::option", default)]
    pub date_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub org_id: String,
    /// `None` applies the item to every application of the organization
    #[serde(default)]
    pub app_id: Option<String>,
}

impl ContentItem {
    /// A fresh item with a generated id, stamped for the given tenant
    pub fn new(scope: &AppScope, org_id: &str, category: String, data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category,
            date_created: timestamp::now(),
            date_updated: None,
            data,
            org_id: org_id.to_string(),
            app_id: scope.app_id().map(str::to_string),
        }
    }
}

/// Client-supplied fields for create and full update
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentItemInput {
    #[serde(default)]
    pub id: Option<String>,
    pub category: String,
    #[serde(default)]
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{from_document, to_document};
    use serde_json::json;

    #[test]
    fn stored_form_keeps_null_app_id_and_wire_names() {
        let item = ContentItem::new(&AppScope::AllApps, "org1", "faq".to_string(), json!("v1"));
        let doc = to_document(&item).unwrap();
        assert_eq!(doc.get("app_id"), Some(&Value::Null));
        assert_eq!(doc.get("date_updated"), Some(&Value::Null));
        for field in ["id", "category", "date_created", "data", "org_id"] {
            assert!(doc.contains_key(field), "missing {}", field);
        }
        let back: ContentItem = from_document(doc).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn scoped_items_carry_app_id() {
        let item = ContentItem::new(&AppScope::Scoped("app1".to_string()), "org1", "faq".to_string(), Value::Null);
        assert_eq!(item.app_id.as_deref(), Some("app1"));
        let other = ContentItem::new(&AppScope::Scoped("app1".to_string()), "org1", "faq".to_string(), Value::Null);
        assert_ne!(item.id, other.id);
    }
}
