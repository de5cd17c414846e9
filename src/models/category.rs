use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;
use crate::types::AppScope;

/// Named category whose permissions are consulted by the authorization layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub org_id: String,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(with = "timestamp")]
    pub date_created: DateTime<Utc>,
    #[serde(with = "timestamp::option", default)]
    pub date_updated: Option<DateTime<Utc>>,
}

impl Category {
    pub fn new(scope: &AppScope, org_id: &str, name: String, permissions: Vec<String>) -> Self {
        Self {
            name,
            permissions,
            org_id: org_id.to_string(),
            app_id: scope.app_id().map(str::to_string),
            date_created: timestamp::now(),
            date_updated: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}
