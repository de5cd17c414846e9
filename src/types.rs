/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Application component of a tenant filter.
///
/// `AllApps` reads and writes across every application of the organization;
/// records created under it carry a `null` app_id. The organization component
/// is never optional and is passed separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppScope {
    Scoped(String),
    AllApps,
}

impl AppScope {
    /// Resolve the scope of one logical operation. Computed once at the edge and
    /// passed by reference to every store call of that operation.
    pub fn resolve(include_all_apps_in_org: bool, current_app_id: &str) -> Self {
        if include_all_apps_in_org {
            AppScope::AllApps
        } else {
            AppScope::Scoped(current_app_id.to_string())
        }
    }

    /// The app_id to filter on, or stamp onto a new record
    pub fn app_id(&self) -> Option<&str> {
        match self {
            AppScope::Scoped(app_id) => Some(app_id),
            AppScope::AllApps => None,
        }
    }

    /// Tenant filter `{org_id, app_id?}` in the document filter language
    pub fn filter(&self, org_id: &str) -> Map<String, Value> {
        let mut filter = Map::new();
        filter.insert("org_id".to_string(), Value::String(org_id.to_string()));
        if let AppScope::Scoped(app_id) = self {
            filter.insert("app_id".to_string(), Value::String(app_id.clone()));
        }
        filter
    }
}
