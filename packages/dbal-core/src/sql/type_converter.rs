//! JSON ↔ SQL parameter conversion
//!
//! `libsql`'s bound-parameter API is stringly typed at this layer: every
//! value handed to a prepared statement is converted to its textual SQL
//! representation before binding. Row materialization (the reverse
//! direction) lives in [`super::result_parser`].

use serde_json::Value;

/// Convert one JSON value to the string form bound into a prepared
/// statement slot.
///
/// - booleans become `"1"`/`"0"`
/// - numbers are rendered in their integer form when they have no
///   fractional part, otherwise their default `f64` form
/// - `null` becomes an empty string
/// - strings pass through unchanged
/// - objects and arrays are serialized to compact JSON text
pub fn json_to_sql_param(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.to_string()
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

/// Convert a JSON object's fields, in the given column order, to bound
/// parameter strings. Columns absent from `data` are skipped entirely
/// (callers build the column list from the same iteration).
pub fn bind_params_in_order<'a>(
    data: &'a serde_json::Map<String, Value>,
    columns: &[String],
) -> Vec<String> {
    columns
        .iter()
        .filter_map(|col| data.get(col).map(json_to_sql_param))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boolean_becomes_one_or_zero() {
        assert_eq!(json_to_sql_param(&json!(true)), "1");
        assert_eq!(json_to_sql_param(&json!(false)), "0");
    }

    #[test]
    fn integer_number_has_no_decimal_point() {
        assert_eq!(json_to_sql_param(&json!(42)), "42");
    }

    #[test]
    fn null_becomes_empty_string() {
        assert_eq!(json_to_sql_param(&Value::Null), "");
    }

    #[test]
    fn object_becomes_compact_json_text() {
        let v = json!({"a": 1, "b": "x"});
        assert_eq!(json_to_sql_param(&v), "{\"a\":1,\"b\":\"x\"}");
    }

    #[test]
    fn array_becomes_compact_json_text() {
        let v = json!([1, 2, 3]);
        assert_eq!(json_to_sql_param(&v), "[1,2,3]");
    }
}
