use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{validate_field, FilterWhere};
use super::matcher::FilterMatcher;
use super::types::{FilterData, FilterOrderInfo, JsonbQuery};

/// A query against one document collection. Every collection is a table of
/// `(_rowid BIGSERIAL, doc JSONB)`; the same filter also evaluates in memory.
pub struct Filter {
    collection: String,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(collection: impl Into<String>) -> Result<Self, FilterError> {
        let collection = collection.into();
        Self::validate_collection_name(&collection)?;
        Ok(Self {
            collection,
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit)?; }
        if let Some(offset) = data.offset { self.offset(offset)?; }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }

        // Apply max limit from config
        let max_limit = crate::config::CONFIG.filter.max_limit.unwrap_or(i64::MAX);
        let applied_limit = if limit > max_limit {
            if crate::config::CONFIG.filter.debug_logging {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            }
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        Ok(self)
    }

    pub fn offset(&mut self, offset: i64) -> Result<&mut Self, FilterError> {
        if offset < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); }
        self.offset = Some(offset);
        Ok(self)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn to_select_sql(&self) -> Result<JsonbQuery, FilterError> {
        let (where_clause, params) = self.where_sql(0)?;
        let query = [
            format!("SELECT doc FROM \"{}\"", self.collection),
            format!("WHERE {}", where_clause),
            FilterOrder::generate(&self.order_data),
            self.build_limit_clause(),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(JsonbQuery { query, params })
    }

    pub fn to_distinct_sql(&self, field: &str) -> Result<JsonbQuery, FilterError> {
        validate_field(field)?;
        let (where_clause, params) = self.where_sql(0)?;
        let query = format!(
            "SELECT DISTINCT doc->'{}' AS value FROM \"{}\" WHERE {} AND doc ? '{}'",
            field, self.collection, where_clause, field
        );
        Ok(JsonbQuery { query, params })
    }

    pub fn to_insert_sql(&self, doc: Map<String, Value>) -> JsonbQuery {
        JsonbQuery {
            query: format!("INSERT INTO \"{}\" (doc) VALUES ($1)", self.collection),
            params: vec![Value::Object(doc)],
        }
    }

    /// Replaces the first matching document
    pub fn to_replace_sql(&self, doc: Map<String, Value>) -> Result<JsonbQuery, FilterError> {
        let (where_clause, mut params) = self.where_sql(1)?;
        params.insert(0, Value::Object(doc));
        let query = format!(
            "UPDATE \"{t}\" SET doc = $1 WHERE _rowid = (SELECT _rowid FROM \"{t}\" WHERE {w} LIMIT 1)",
            t = self.collection,
            w = where_clause
        );
        Ok(JsonbQuery { query, params })
    }

    /// Merges `set` into every matching document (top-level keys only)
    pub fn to_update_sql(&self, set: Map<String, Value>) -> Result<JsonbQuery, FilterError> {
        for field in set.keys() {
            validate_field(field)?;
        }
        let (where_clause, mut params) = self.where_sql(1)?;
        params.insert(0, Value::Object(set));
        let query = format!("UPDATE \"{}\" SET doc = doc || $1 WHERE {}", self.collection, where_clause);
        Ok(JsonbQuery { query, params })
    }

    pub fn to_delete_sql(&self) -> Result<JsonbQuery, FilterError> {
        let (where_clause, params) = self.where_sql(0)?;
        let query = format!("DELETE FROM \"{}\" WHERE {}", self.collection, where_clause);
        Ok(JsonbQuery { query, params })
    }

    pub fn matcher(&self) -> Result<FilterMatcher, FilterError> {
        FilterMatcher::new(self.where_data.as_ref().unwrap_or(&Value::Null))
    }

    /// Runs the whole query (match, order, offset, limit) over in-memory documents
    pub fn apply<'a, I>(&self, docs: I) -> Result<Vec<Map<String, Value>>, FilterError>
    where
        I: IntoIterator<Item = &'a Map<String, Value>>,
    {
        let matcher = self.matcher()?;
        let mut out: Vec<Map<String, Value>> = docs.into_iter().filter(|d| matcher.matches(d)).cloned().collect();
        if !self.order_data.is_empty() {
            out.sort_by(|a, b| FilterOrder::compare(&self.order_data, a, b));
        }
        let offset = self.offset.unwrap_or(0).max(0) as usize;
        let limit = self.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(out.into_iter().skip(offset).take(limit).collect())
    }

    fn where_sql(&self, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        match &self.where_data {
            Some(where_data) => FilterWhere::generate(where_data, starting_param_index),
            None => Ok(("TRUE".to_string(), vec![])),
        }
    }

    fn validate_collection_name(name: &str) -> Result<(), FilterError> {
        if name.is_empty() { return Err(FilterError::InvalidCollection("Collection name cannot be empty".to_string())); }
        validate_field(name).map_err(|_| FilterError::InvalidCollection(format!("Invalid collection name format: {}", name)))
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}
