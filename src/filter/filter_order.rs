use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_where::validate_field;
use super::matcher::compare_values;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["date_created desc", "category asc"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v { out.extend(Self::parse_order_string(s)); }
                }
                out
            }
            Value::Object(obj) => {
                // { "date_created": "desc" }
                let mut out = Vec::new();
                for (k, v) in obj {
                    out.push(FilterOrderInfo { field: k.clone(), sort: SortDirection::parse(v.as_str().unwrap_or("asc")) });
                }
                out
            }
            _ => vec![],
        };

        for info in &infos {
            validate_field(&info.field)?;
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        // split on commas, then each token into field and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let mut it = trimmed.split_whitespace();
            if let Some(field) = it.next() {
                out.push(FilterOrderInfo { field: field.to_string(), sort: SortDirection::parse(it.next().unwrap_or("asc")) });
            }
        }
        out
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() { return String::new(); }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("doc->'{}' {}", i.field, i.sort.keyword()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// In-memory counterpart of `generate`; missing fields sort first
    pub fn compare(infos: &[FilterOrderInfo], a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
        for info in infos {
            let ordering = match (a.get(&info.field), b.get(&info.field)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            };
            let ordering = match info.sort {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object_and_string_forms() {
        let infos = FilterOrder::validate_and_parse(&json!({"date_created": "desc"})).unwrap();
        assert_eq!(infos[0].sort, SortDirection::Desc);

        let infos = FilterOrder::validate_and_parse(&json!("date_created, category DESC")).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].sort, SortDirection::Asc);
        assert_eq!(infos[1].sort, SortDirection::Desc);
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY doc->'date_created' ASC, doc->'category' DESC");
    }

    #[test]
    fn unknown_direction_is_ascending() {
        assert_eq!(SortDirection::parse("sideways"), SortDirection::Asc);
        assert_eq!(SortDirection::parse("DESC"), SortDirection::Desc);
    }

    #[test]
    fn rejects_injected_field() {
        assert!(FilterOrder::validate_and_parse(&json!({"x' DESC; --": "asc"})).is_err());
    }
}
