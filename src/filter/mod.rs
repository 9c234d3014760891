//! Filter expressions for list requests.
//!
//! A filter is a boolean expression over the fields of one resource kind,
//! written in a small CEL-like language:
//!
//! ```text
//! mime_type == "application/yaml" && labels["team"] == "pets"
//! create_time > "2024-01-01T00:00:00Z" || name.startsWith("projects/demo")
//! ```
//!
//! [`Filter::compile`] parses and type checks the expression against a
//! [`Schema`] once; [`Filter::matches`] then evaluates it per row.

mod ast;
mod error;
mod eval;
mod parser;
mod schema;

use std::collections::BTreeMap;

use serde_json::Value;

pub use ast::{BinaryOp, Expr, Literal, Type, UnaryOp};
pub use error::{FilterError, FilterResult};
pub use parser::Parser;
pub use schema::{FieldType, Schema};

/// A compiled filter.
#[derive(Debug, Clone)]
pub struct Filter {
    source: String,
    expr: Option<Expr>,
    schema: Schema,
}

impl Filter {
    /// Parse and type check `source`; a blank filter matches every row.
    pub fn compile(source: &str, schema: &Schema) -> FilterResult<Self> {
        let expr = match Parser::parse(source)? {
            Some(expr) => Some(eval::check(expr, schema)?.0),
            None => None,
        };
        Ok(Self {
            source: source.to_string(),
            expr,
            schema: schema.clone(),
        })
    }

    /// the filter that matches everything
    pub fn all(schema: &Schema) -> Self {
        Self {
            source: String::new(),
            expr: None,
            schema: schema.clone(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.expr.is_none()
    }

    /// Evaluate against the fields of one row.
    ///
    /// Fails if the expression does not produce a bool.
    pub fn matches(&self, fields: &BTreeMap<String, Value>) -> FilterResult<bool> {
        match &self.expr {
            Some(expr) => eval::as_bool(eval::evaluate(expr, &self.schema, fields)?),
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .strings(&["name", "mime_type", "spec_id"])
            .field("size_bytes", FieldType::Int)
            .field("create_time", FieldType::Timestamp)
            .field("labels", FieldType::StringMap)
    }

    fn row(mime_type: &str, size: i64, team: Option<&str>) -> BTreeMap<String, Value> {
        let labels = match team {
            Some(team) => json!({ "team": team }),
            None => json!({}),
        };
        let value = json!({
            "name": "projects/demo/apis/pets/versions/v1/specs/openapi",
            "spec_id": "openapi",
            "mime_type": mime_type,
            "size_bytes": size,
            "create_time": "2024-03-01T12:00:00.000000000Z",
            "labels": labels,
        });
        value.as_object().unwrap().clone().into_iter().collect()
    }

    fn matches(filter: &str, fields: &BTreeMap<String, Value>) -> bool {
        Filter::compile(filter, &schema()).unwrap().matches(fields).unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = Filter::compile("  ", &schema()).unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches(&BTreeMap::new()).unwrap());
    }

    #[test]
    fn test_comparisons_and_logic() {
        let yaml = row("application/yaml", 120, Some("pets"));
        let json = row("application/json", 80, None);

        assert!(matches(r#"mime_type == "application/yaml""#, &yaml));
        assert!(!matches(r#"mime_type == "application/yaml""#, &json));
        assert!(matches("size_bytes > 100 && mime_type != 'application/json'", &yaml));
        assert!(matches("size_bytes > 100 || spec_id == 'openapi'", &json));
        assert!(matches("NOT (size_bytes < 100)", &yaml));
        assert!(matches("!(size_bytes >= 100)", &json));
    }

    #[test]
    fn test_maps() {
        let pets = row("application/yaml", 1, Some("pets"));
        let none = row("application/yaml", 1, None);

        assert!(matches("labels['team'] == 'pets'", &pets));
        assert!(matches("labels['team'] == ''", &none));
        assert!(matches("'team' in labels", &pets));
        assert!(!matches("'team' in labels", &none));
        assert!(matches("size(labels) == 1", &pets));
    }

    #[test]
    fn test_string_methods() {
        let fields = row("application/x.protobuf+gzip", 1, None);
        assert!(matches("name.startsWith('projects/demo/')", &fields));
        assert!(matches("mime_type.endsWith('+gzip')", &fields));
        assert!(matches("mime_type.contains('protobuf')", &fields));
        assert!(matches(r"spec_id.matches('^open[a-z]+$')", &fields));
        assert!(matches("size(spec_id) == 7", &fields));
    }

    #[test]
    fn test_timestamps() {
        let fields = row("application/yaml", 1, None);
        assert!(matches("create_time > '2024-01-01T00:00:00Z'", &fields));
        assert!(matches("create_time < timestamp('2025-01-01T00:00:00Z')", &fields));
        assert!(Filter::compile("create_time > 'yesterday'", &schema()).is_err());
    }

    #[test]
    fn test_compile_errors() {
        let schema = schema();
        assert!(matches!(
            Filter::compile("owner == 'me'", &schema),
            Err(FilterError::UnknownField(_))
        ));
        assert!(matches!(
            Filter::compile("size_bytes == 'big'", &schema),
            Err(FilterError::Type(_))
        ));
        assert!(matches!(Filter::compile("labels > 1", &schema), Err(FilterError::Type(_))));
        assert!(matches!(Filter::compile("spec_id.matches('(')", &schema), Err(FilterError::Pattern(_))));
        assert!(matches!(Filter::compile("mime_type ==", &schema), Err(FilterError::Syntax(_))));
    }

    #[test]
    fn test_non_boolean_result_fails_at_evaluation() {
        let filter = Filter::compile("mime_type", &schema()).unwrap();
        let err = filter.matches(&row("application/yaml", 1, None)).unwrap_err();
        assert!(matches!(err, FilterError::NotBoolean("string")));
    }

    #[test]
    fn test_missing_fields_read_as_empty() {
        let empty = BTreeMap::new();
        assert!(matches("mime_type == ''", &empty));
        assert!(matches("size_bytes == 0", &empty));
    }
}
