//! Structural validation of a parsed entity schema
//!
//! The loader calls [`validate`] after parsing; a schema that fails here is
//! rejected outright and never enters the cache.

use std::collections::HashSet;

use super::types::EntitySchema;
use crate::error::{DbalError, Result};

/// Validate `schema`, returning the first structural problem found.
pub fn validate(schema: &EntitySchema) -> Result<()> {
    if schema.name.trim().is_empty() {
        return Err(DbalError::validation("entity name must not be empty".to_string()));
    }
    if schema.fields.is_empty() {
        return Err(DbalError::validation(format!(
            "entity '{}' declares no fields",
            schema.name
        )));
    }

    let primary_count = schema.fields.iter().filter(|f| f.primary).count();
    if primary_count == 0 {
        tracing::warn!(entity = %schema.name, "schema declares no primary field");
    } else if primary_count > 1 {
        return Err(DbalError::validation(format!(
            "entity '{}' declares {} primary fields, expected at most one",
            schema.name, primary_count
        )));
    }

    let mut seen = HashSet::new();
    for field in &schema.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(DbalError::validation(format!(
                "entity '{}' declares field '{}' more than once",
                schema.name, field.name
            )));
        }
        if field.field_type == super::types::FieldType::Enum {
            let values = field.enum_values.as_ref().ok_or_else(|| {
                DbalError::validation(format!(
                    "entity '{}' field '{}' is type 'enum' but has no values",
                    schema.name, field.name
                ))
            })?;
            if values.is_empty() {
                return Err(DbalError::validation(format!(
                    "entity '{}' field '{}' declares an empty enum",
                    schema.name, field.name
                )));
            }
        }
        if let (Some(min), Some(max)) = (field.min_length, field.max_length) {
            if min > max {
                return Err(DbalError::validation(format!(
                    "entity '{}' field '{}' has minLength {} greater than maxLength {}",
                    schema.name, field.name, min, max
                )));
            }
        }
    }

    for index in &schema.indexes {
        for field_name in &index.fields {
            if !schema.has_field(field_name) {
                return Err(DbalError::validation(format!(
                    "entity '{}' declares an index on unknown field '{}'",
                    schema.name, field_name
                )));
            }
        }
    }

    for relation in &schema.relations {
        if relation.target.trim().is_empty() {
            return Err(DbalError::validation(format!(
                "entity '{}' relation '{}' has an empty target",
                schema.name, relation.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Field, FieldType, Index};

    fn base_schema() -> EntitySchema {
        EntitySchema {
            name: "Post".to_string(),
            display_name: None,
            description: None,
            version: "1".to_string(),
            fields: vec![{
                let mut f = Field::new("id", FieldType::Uuid);
                f.primary = true;
                f
            }],
            indexes: Vec::new(),
            relations: Vec::new(),
            metadata: Default::default(),
            acl: None,
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut schema = base_schema();
        schema.name = "  ".to_string();
        assert!(validate(&schema).is_err());
    }

    #[test]
    fn no_fields_is_rejected() {
        let mut schema = base_schema();
        schema.fields.clear();
        assert!(validate(&schema).is_err());
    }

    #[test]
    fn multiple_primaries_is_rejected() {
        let mut schema = base_schema();
        let mut second = Field::new("other_id", FieldType::Uuid);
        second.primary = true;
        schema.fields.push(second);
        assert!(validate(&schema).is_err());
    }

    #[test]
    fn zero_primaries_is_a_warning_not_an_error() {
        let mut schema = base_schema();
        schema.fields[0].primary = false;
        assert!(validate(&schema).is_ok());
    }

    #[test]
    fn index_on_missing_field_is_rejected() {
        let mut schema = base_schema();
        schema.indexes.push(Index {
            fields: vec!["ghost".to_string()],
            unique: false,
            name: None,
        });
        assert!(validate(&schema).is_err());
    }

    #[test]
    fn min_length_greater_than_max_length_is_rejected() {
        let mut schema = base_schema();
        let mut title = Field::new("title", FieldType::String);
        title.min_length = Some(10);
        title.max_length = Some(5);
        schema.fields.push(title);
        assert!(validate(&schema).is_err());
    }
}
