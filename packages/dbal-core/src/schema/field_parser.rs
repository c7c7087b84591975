//! YAML field parsing
//!
//! Field definitions accept both camelCase and snake_case keys (`minLength`
//! / `min_length`) since hand-authored schema files mix conventions freely.

use serde_yaml::Value;

use super::types::{Field, FieldType};
use crate::error::{DbalError, Result};

fn get<'a>(map: &'a serde_yaml::Mapping, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| map.get(Value::String((*k).to_string())))
}

fn as_bool(map: &serde_yaml::Mapping, keys: &[&str], default: bool) -> bool {
    get(map, keys).and_then(Value::as_bool).unwrap_or(default)
}

fn as_str(map: &serde_yaml::Mapping, keys: &[&str]) -> Option<String> {
    get(map, keys).and_then(Value::as_str).map(str::to_string)
}

fn as_u32(map: &serde_yaml::Mapping, keys: &[&str]) -> Option<u32> {
    get(map, keys).and_then(Value::as_u64).map(|n| n as u32)
}

/// Parse one `fields.<name>:` entry into a [`Field`].
pub fn parse_field(name: &str, value: &Value) -> Result<Field> {
    let map = value.as_mapping().ok_or_else(|| {
        DbalError::validation(format!("field '{name}' must be a mapping"))
    })?;

    let type_name = as_str(map, &["type"]).ok_or_else(|| {
        DbalError::validation(format!("field '{name}' is missing a 'type'"))
    })?;
    let field_type = FieldType::parse(&type_name).ok_or_else(|| {
        DbalError::validation(format!("field '{name}' has unknown type '{type_name}'"))
    })?;

    let mut field = Field::new(name, field_type);
    field.required = as_bool(map, &["required"], false);
    field.unique = as_bool(map, &["unique"], false);
    field.primary = as_bool(map, &["primary", "primaryKey", "primary_key"], false);
    field.generated = as_bool(map, &["generated"], false);
    field.nullable = as_bool(map, &["nullable"], false);
    field.index = as_bool(map, &["index", "indexed"], false);
    field.default = as_str(map, &["default"]);
    field.references = as_str(map, &["references"]);
    field.min_length = as_u32(map, &["minLength", "min_length"]);
    field.max_length = as_u32(map, &["maxLength", "max_length"]);
    field.pattern = as_str(map, &["pattern"]);
    field.description = as_str(map, &["description"]);

    if field_type == FieldType::Enum {
        let values = get(map, &["values"])
            .and_then(Value::as_sequence)
            .ok_or_else(|| {
                DbalError::validation(format!(
                    "field '{name}' is type 'enum' but declares no 'values'"
                ))
            })?;
        let values: Vec<String> = values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        if values.is_empty() {
            return Err(DbalError::validation(format!(
                "field '{name}' declares an empty 'values' list"
            )));
        }
        field.enum_values = Some(values);
    }

    Ok(field)
}

/// Parse the `fields:` mapping of an entity schema document.
pub fn parse_fields(fields_value: &Value) -> Result<Vec<Field>> {
    let map = fields_value
        .as_mapping()
        .ok_or_else(|| DbalError::validation("'fields' must be a mapping".to_string()))?;

    map.iter()
        .map(|(key, value)| {
            let name = key
                .as_str()
                .ok_or_else(|| DbalError::validation("field names must be strings".to_string()))?;
            parse_field(name, value)
        })
        .collect()
}
