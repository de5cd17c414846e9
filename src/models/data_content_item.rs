use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::timestamp;
use crate::types::AppScope;

/// Key/value content addressed by a client-chosen key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataContentItem {
    pub key: String,
    pub category: String,
    #[serde(default)]
    pub data: Value,
    pub org_id: String,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(with = "timestamp")]
    pub date_created: DateTime<Utc>,
    #[serde(with = "timestamp::option", default)]
    pub date_updated: Option<DateTime<Utc>>,
}

impl DataContentItem {
    pub fn new(scope: &AppScope, org_id: &str, input: DataContentItemInput) -> Self {
        Self {
            key: input.key,
            category: input.category,
            data: input.data,
            org_id: org_id.to_string(),
            app_id: scope.app_id().map(str::to_string),
            date_created: timestamp::now(),
            date_updated: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataContentItemInput {
    pub key: String,
    pub category: String,
    #[serde(default)]
    pub data: Value,
}
