use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};

/// Parsed WHERE clause. A top-level object is an implicit `$and` of its keys.
#[derive(Debug, Clone)]
pub enum WhereNode {
    Field(FilterWhereInfo),
    And(Vec<WhereNode>),
    Or(Vec<WhereNode>),
    Not(Box<WhereNode>),
}

/// Builds JSONB predicates over the `doc` column, numbering parameters from
/// `starting_param_index + 1`.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let node = Self::parse(where_data)?;
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(&node)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        Self::parse(where_data).map(|_| ())
    }

    pub fn parse(where_data: &Value) -> Result<WhereNode, FilterError> {
        match where_data {
            Value::Null => Ok(WhereNode::And(vec![])),
            Value::Object(obj) => {
                let mut nodes = Vec::with_capacity(obj.len());
                for (key, value) in obj {
                    if key.starts_with('$') {
                        nodes.push(Self::parse_logical_operator(key, value)?);
                    } else {
                        nodes.extend(Self::parse_field_condition(key, value)?);
                    }
                }
                Ok(WhereNode::And(nodes))
            }
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<WhereNode, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let nodes = arr.iter().map(Self::parse).collect::<Result<Vec<_>, _>>()?;
                Ok(if op == "$and" { WhereNode::And(nodes) } else { WhereNode::Or(nodes) })
            }
            "$not" => Ok(WhereNode::Not(Box::new(Self::parse(value)?))),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<WhereNode>, FilterError> {
        validate_field(field)?;

        // An object whose keys are all operators is an operator map, anything else is a literal
        let is_operator_map = matches!(value, Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')));
        if !is_operator_map {
            // Implicit equality: { field: value }
            return Ok(vec![WhereNode::Field(FilterWhereInfo {
                field: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            })]);
        }

        let mut nodes = vec![];
        if let Value::Object(obj) = value {
            for (op_key, op_val) in obj {
                let operator = FilterOp::from_key(op_key)?;
                match operator {
                    op if op.takes_list() && !op_val.is_array() => {
                        return Err(FilterError::InvalidOperatorData(format!("{} requires array", op_key)));
                    }
                    FilterOp::Exists if !op_val.is_boolean() => {
                        return Err(FilterError::InvalidOperatorData("$exists requires boolean".to_string()));
                    }
                    _ => {}
                }
                nodes.push(WhereNode::Field(FilterWhereInfo {
                    field: field.to_string(),
                    operator,
                    data: op_val.clone(),
                }));
            }
        }
        Ok(nodes)
    }

    fn build(&mut self, node: &WhereNode) -> Result<String, FilterError> {
        match node {
            WhereNode::Field(info) => self.build_sql_condition(info),
            WhereNode::And(nodes) => self.join(nodes, " AND ", "TRUE"),
            WhereNode::Or(nodes) => self.join(nodes, " OR ", "FALSE"),
            WhereNode::Not(inner) => Ok(format!("NOT ({})", self.build(inner)?)),
        }
    }

    fn join(&mut self, nodes: &[WhereNode], joiner: &str, empty: &str) -> Result<String, FilterError> {
        if nodes.is_empty() {
            return Ok(empty.to_string());
        }
        let parts = nodes
            .iter()
            .map(|n| self.build(n).map(|sql| format!("({})", sql)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts.join(joiner))
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let field = &condition.field;
        let path = format!("doc->'{}'", field);
        match condition.operator {
            FilterOp::Eq => {
                // A null comparand matches both explicit nulls and missing fields
                if condition.data.is_null() {
                    Ok(format!("(NOT (doc ? '{}') OR {} = 'null'::jsonb)", field, path))
                } else {
                    Ok(format!("{} = {}", path, self.param(condition.data.clone())))
                }
            }
            FilterOp::Ne => {
                if condition.data.is_null() {
                    Ok(format!("(doc ? '{}' AND {} <> 'null'::jsonb)", field, path))
                } else {
                    Ok(format!("{} IS DISTINCT FROM {}", path, self.param(condition.data.clone())))
                }
            }
            FilterOp::Gt => Ok(format!("{} > {}", path, self.param(condition.data.clone()))),
            FilterOp::Gte => Ok(format!("{} >= {}", path, self.param(condition.data.clone()))),
            FilterOp::Lt => Ok(format!("{} < {}", path, self.param(condition.data.clone()))),
            FilterOp::Lte => Ok(format!("{} <= {}", path, self.param(condition.data.clone()))),
            FilterOp::In => {
                let values = condition.data.as_array().cloned().unwrap_or_default();
                if values.is_empty() {
                    return Ok("FALSE".to_string());
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                Ok(format!("{} IN ({})", path, params.join(", ")))
            }
            FilterOp::NIn => {
                let values = condition.data.as_array().cloned().unwrap_or_default();
                if values.is_empty() {
                    return Ok("TRUE".to_string());
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                Ok(format!("({} IS NULL OR {} NOT IN ({}))", path, path, params.join(", ")))
            }
            FilterOp::Exists => {
                if condition.data.as_bool().unwrap_or(true) {
                    Ok(format!("doc ? '{}'", field))
                } else {
                    Ok(format!("NOT (doc ? '{}')", field))
                }
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Field names are inlined into SQL, so only `[A-Za-z0-9_]` is accepted
pub fn validate_field(field: &str) -> Result<(), FilterError> {
    let mut chars = field.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return Err(FilterError::InvalidField(format!("Invalid field name format: {}", field))),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FilterError::InvalidField(format!("Invalid field name format: {}", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_binds_jsonb_params() {
        let (sql, params) = FilterWhere::generate(&json!({"org_id": "org1", "app_id": "app1"}), 0).unwrap();
        assert_eq!(sql, "(doc->'app_id' = $1) AND (doc->'org_id' = $2)");
        assert_eq!(params, vec![json!("app1"), json!("org1")]);
    }

    #[test]
    fn null_equality_matches_missing_fields() {
        let (sql, params) = FilterWhere::generate(&json!({"app_id": null}), 0).unwrap();
        assert_eq!(sql, "((NOT (doc ? 'app_id') OR doc->'app_id' = 'null'::jsonb))");
        assert!(params.is_empty());
    }

    #[test]
    fn in_operator_expands_params_after_offset() {
        let (sql, params) = FilterWhere::generate(&json!({"id": {"$in": ["a", "b"]}}), 2).unwrap();
        assert_eq!(sql, "(doc->'id' IN ($3, $4))");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn empty_in_never_matches() {
        let (sql, _) = FilterWhere::generate(&json!({"id": {"$in": []}}), 0).unwrap();
        assert_eq!(sql, "(FALSE)");
    }

    #[test]
    fn nested_logical_operators_share_param_numbering() {
        let where_data = json!({"$or": [{"category": "a"}, {"category": "b"}], "org_id": "o"});
        let (sql, params) = FilterWhere::generate(&where_data, 0).unwrap();
        assert_eq!(sql, "(((doc->'category' = $1)) OR ((doc->'category' = $2))) AND (doc->'org_id' = $3)");
        assert_eq!(params, vec![json!("a"), json!("b"), json!("o")]);
    }

    #[test]
    fn rejects_unsafe_field_names() {
        assert!(FilterWhere::generate(&json!({"a'; DROP TABLE x; --": 1}), 0).is_err());
        assert!(FilterWhere::generate(&json!({"1abc": 1}), 0).is_err());
        assert!(validate_field("_id").is_ok());
    }

    #[test]
    fn rejects_unknown_operators() {
        let err = FilterWhere::generate(&json!({"name": {"$regex": "x"}}), 0).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator(_)));
    }

    #[test]
    fn literal_objects_compare_by_equality() {
        let (sql, params) = FilterWhere::generate(&json!({"data": {"title": "x"}}), 0).unwrap();
        assert_eq!(sql, "(doc->'data' = $1)");
        assert_eq!(params, vec![json!({"title": "x"})]);
    }
}
