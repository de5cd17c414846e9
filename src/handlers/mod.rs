// Route handlers grouped by resource. Client and admin routes share the same
// handler modules; the router decides which middleware guards them.
pub mod assets;
pub mod categories;
pub mod content_items;
pub mod data_items;
pub mod feed;
pub mod legacy;
pub mod system;

use serde::Deserialize;

/// `?all_apps=true` widens the operation to every app of the caller's org
#[derive(Debug, Default, Deserialize)]
pub struct AllAppsQuery {
    #[serde(default)]
    pub all_apps: bool,
}

/// Comma separated list parameter (`ids=a,b,c`); blank entries are dropped
pub fn split_list(value: Option<&str>) -> Option<Vec<String>> {
    value.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}
