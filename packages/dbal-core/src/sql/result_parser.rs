//! Row materialization: SQL result rows back into schema-typed JSON
//!
//! `libsql::Row` only exposes typed getters (`get::<String>`, `get::<i64>`,
//! ...); this module maps a schema's declared field type to the getter to
//! call. A column the schema does not declare is dropped from the output
//! entirely — the schema is the source of truth for what a record looks
//! like, not the raw row shape.

use libsql::Row;
use serde_json::{Map, Value};

use crate::error::{DbalError, Result};
use crate::schema::types::{EntitySchema, FieldType};

fn column_to_json(row: &Row, index: i32, field_type: Option<FieldType>) -> Result<Value> {
    match field_type {
        Some(FieldType::Boolean) => {
            let raw: Option<i64> = row
                .get(index)
                .map_err(|e| DbalError::database(format!("reading column {index}: {e}")))?;
            Ok(match raw {
                Some(v) => Value::Bool(v != 0),
                None => Value::Null,
            })
        }
        Some(ft) if ft.is_numeric() => {
            let raw: Option<i64> = row
                .get(index)
                .map_err(|e| DbalError::database(format!("reading column {index}: {e}")))?;
            Ok(match raw {
                Some(v) => Value::Number(v.into()),
                None => Value::Null,
            })
        }
        Some(FieldType::Json) => {
            let raw: Option<String> = row
                .get(index)
                .map_err(|e| DbalError::database(format!("reading column {index}: {e}")))?;
            Ok(match raw {
                Some(text) if !text.is_empty() => {
                    serde_json::from_str(&text).unwrap_or(Value::String(text))
                }
                _ => Value::Null,
            })
        }
        _ => {
            let raw: Option<String> = row
                .get(index)
                .map_err(|e| DbalError::database(format!("reading column {index}: {e}")))?;
            Ok(match raw {
                Some(s) => Value::String(s),
                None => Value::Null,
            })
        }
    }
}

/// Materialize one `libsql` row into a JSON object, using `schema` to
/// decide each column's target type. Columns absent from `schema` are
/// skipped rather than guessed at.
pub fn row_to_json(row: &Row, schema: &EntitySchema) -> Result<Value> {
    let mut out = Map::new();
    let column_count = row.column_count();
    for index in 0..column_count {
        let name = row
            .column_name(index)
            .map(str::to_string)
            .unwrap_or_else(|| index.to_string());
        let Some(field) = schema.field(&name) else { continue };
        out.insert(name, column_to_json(row, index, Some(field.field_type))?);
    }
    Ok(Value::Object(out))
}
