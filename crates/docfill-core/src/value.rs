//! Data mapping helpers
//!
//! Template data is a JSON object: scalar values fill `${name}` placeholders,
//! and array-of-object values drive `#name[...]` repetition. `serde_json`'s
//! tagged value type gives the scalar / mapping / sequence split directly, so
//! every consumption site pattern-matches instead of probing types at runtime.

use serde_json::{Map, Value};

/// The data context for one render scope: name → value
pub type DataMap = Map<String, Value>;

/// Textual form of a scalar value, as it appears in the output document
///
/// Strings render without quotes; null renders empty. Objects and arrays are
/// not meaningful as placeholder values but render as compact JSON rather
/// than failing, keeping substitution total.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// The rows of an array-valued entry, if the value is a sequence
pub fn as_rows(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(rows) => Some(rows),
        _ => None,
    }
}

/// Normalize one repetition row into a row-mapping
///
/// Rows are expected to be objects; anything else yields an empty mapping so
/// the cloned range is still emitted, just with nothing to substitute.
pub fn row_mapping(row: &Value) -> DataMap {
    match row {
        Value::Object(map) => map.clone(),
        _ => DataMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_text_forms() {
        assert_eq!(scalar_text(&json!("plain")), "plain");
        assert_eq!(scalar_text(&json!(42)), "42");
        assert_eq!(scalar_text(&json!(3.5)), "3.5");
        assert_eq!(scalar_text(&json!(true)), "true");
        assert_eq!(scalar_text(&json!(null)), "");
    }

    #[test]
    fn test_scalar_text_degenerate_shapes() {
        assert_eq!(scalar_text(&json!(["a", 1])), r#"["a",1]"#);
        assert_eq!(scalar_text(&json!({"k": "v"})), r#"{"k":"v"}"#);
    }

    #[test]
    fn test_as_rows() {
        let arr = json!([{"v": 1}, {"v": 2}]);
        assert_eq!(as_rows(&arr).unwrap().len(), 2);
        assert!(as_rows(&json!("not an array")).is_none());
        assert!(as_rows(&json!({"v": 1})).is_none());
    }

    #[test]
    fn test_row_mapping_non_object_is_empty() {
        let row = json!({"name": "Ada"});
        assert_eq!(row_mapping(&row).get("name"), Some(&json!("Ada")));
        assert!(row_mapping(&json!(17)).is_empty());
        assert!(row_mapping(&json!(null)).is_empty());
    }
}
