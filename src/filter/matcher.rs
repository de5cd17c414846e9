//! Evaluates parsed WHERE clauses against in-memory documents with the same
//! semantics as the JSONB predicates produced by `FilterWhere`.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_where::{FilterWhere, WhereNode};
use super::types::{FilterOp, FilterWhereInfo};

pub struct FilterMatcher {
    root: WhereNode,
}

impl FilterMatcher {
    pub fn new(where_data: &Value) -> Result<Self, FilterError> {
        Ok(Self { root: FilterWhere::parse(where_data)? })
    }

    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        Self::eval(&self.root, doc)
    }

    fn eval(node: &WhereNode, doc: &Map<String, Value>) -> bool {
        match node {
            WhereNode::Field(info) => Self::eval_condition(info, doc),
            WhereNode::And(nodes) => nodes.iter().all(|n| Self::eval(n, doc)),
            WhereNode::Or(nodes) => nodes.iter().any(|n| Self::eval(n, doc)),
            WhereNode::Not(inner) => !Self::eval(inner, doc),
        }
    }

    fn eval_condition(condition: &FilterWhereInfo, doc: &Map<String, Value>) -> bool {
        let actual = doc.get(&condition.field);
        let expected = &condition.data;
        match condition.operator {
            FilterOp::Eq => match actual {
                None => expected.is_null(),
                Some(v) => v == expected,
            },
            FilterOp::Ne => match actual {
                None => !expected.is_null(),
                Some(v) => v != expected,
            },
            FilterOp::Gt => Self::ordered(actual, expected, |o| o == Ordering::Greater),
            FilterOp::Gte => Self::ordered(actual, expected, |o| o != Ordering::Less),
            FilterOp::Lt => Self::ordered(actual, expected, |o| o == Ordering::Less),
            FilterOp::Lte => Self::ordered(actual, expected, |o| o != Ordering::Greater),
            FilterOp::In => match (actual, expected.as_array()) {
                (Some(v), Some(values)) => values.contains(v),
                _ => false,
            },
            FilterOp::NIn => match (actual, expected.as_array()) {
                (Some(v), Some(values)) => !values.contains(v),
                _ => true,
            },
            FilterOp::Exists => actual.is_some() == expected.as_bool().unwrap_or(true),
        }
    }

    fn ordered(actual: Option<&Value>, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
        actual
            .and_then(|v| compare_values(v, expected))
            .map(accept)
            .unwrap_or(false)
    }
}

/// Orders two JSON scalars of the same kind; mixed kinds are incomparable
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn null_equality_covers_missing_and_explicit_null() {
        let matcher = FilterMatcher::new(&json!({"app_id": null})).unwrap();
        assert!(matcher.matches(&doc(json!({"org_id": "o"}))));
        assert!(matcher.matches(&doc(json!({"app_id": null}))));
        assert!(!matcher.matches(&doc(json!({"app_id": "a"}))));
    }

    #[test]
    fn tenant_filter_requires_every_component() {
        let matcher = FilterMatcher::new(&json!({"org_id": "o1", "app_id": "a1"})).unwrap();
        assert!(matcher.matches(&doc(json!({"org_id": "o1", "app_id": "a1"}))));
        assert!(!matcher.matches(&doc(json!({"org_id": "o1", "app_id": "a2"}))));
        assert!(!matcher.matches(&doc(json!({"org_id": "o2", "app_id": "a1"}))));
    }

    #[test]
    fn membership_and_existence() {
        let matcher = FilterMatcher::new(&json!({"category": {"$in": ["a", "b"]}, "app_id": {"$exists": true}})).unwrap();
        assert!(matcher.matches(&doc(json!({"category": "b", "app_id": null}))));
        assert!(!matcher.matches(&doc(json!({"category": "b"}))));
        assert!(!matcher.matches(&doc(json!({"category": "c", "app_id": null}))));
    }

    #[test]
    fn logical_operators() {
        let matcher = FilterMatcher::new(&json!({"$or": [{"n": {"$gt": 5}}, {"$not": {"n": {"$gte": 0}}}]})).unwrap();
        assert!(matcher.matches(&doc(json!({"n": 6}))));
        assert!(matcher.matches(&doc(json!({"n": -1}))));
        assert!(!matcher.matches(&doc(json!({"n": 3}))));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let matcher = FilterMatcher::new(&Value::Null).unwrap();
        assert!(matcher.matches(&Map::new()));
    }
}
