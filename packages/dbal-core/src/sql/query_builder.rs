//! Schema-driven SQL statement generation
//!
//! Every builder returns the statement text plus the ordered list of JSON
//! values to bind (already schema-driven, not yet string-converted — the
//! caller hands those straight to [`super::type_converter::json_to_sql_param`]
//! at bind time so the converter stays a single, independently testable
//! seam).

use serde_json::{Map, Value};

use super::dialect::Dialect;
use crate::error::{DbalError, Result};
use crate::schema::types::EntitySchema;

/// A statement ready to prepare-and-bind.
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

fn quoted(dialect: Dialect, ident: &str) -> String {
    dialect.quote_ident(ident)
}

/// The columns an `INSERT` fills: every field that is either provided by
/// the caller, or neither generated nor auto-managed (`createdAt`/`updatedAt`
/// default handling lives in the caller, not here).
fn insertable_columns<'a>(schema: &'a EntitySchema, data: &Map<String, Value>) -> Vec<&'a str> {
    schema
        .fields
        .iter()
        .filter(|f| !f.generated || data.contains_key(&f.name))
        .map(|f| f.name.as_str())
        .collect()
}

pub fn build_insert(dialect: Dialect, schema: &EntitySchema, data: &Map<String, Value>) -> Result<BuiltQuery> {
    let columns = insertable_columns(schema, data);
    if columns.is_empty() {
        return Err(DbalError::validation(format!(
            "no insertable columns for entity '{}'",
            schema.name
        )));
    }

    let mut params = Vec::with_capacity(columns.len());
    let mut placeholders = Vec::with_capacity(columns.len());
    for (i, col) in columns.iter().enumerate() {
        params.push(data.get(*col).cloned().unwrap_or(Value::Null));
        placeholders.push(dialect.placeholder(i + 1));
    }

    let column_list = columns.iter().map(|c| quoted(dialect, c)).collect::<Vec<_>>().join(", ");
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted(dialect, &schema.name),
        column_list,
        placeholders.join(", ")
    );
    if dialect.supports_returning() {
        sql.push_str(" RETURNING *");
    }

    Ok(BuiltQuery { sql, params })
}

fn primary_key_name(schema: &EntitySchema) -> &str {
    schema
        .primary_field()
        .map(|f| f.name.as_str())
        .unwrap_or("id")
}

pub fn build_select_by_id(dialect: Dialect, schema: &EntitySchema, id: &Value) -> BuiltQuery {
    let pk = primary_key_name(schema);
    let sql = format!(
        "SELECT * FROM {} WHERE {} = {}",
        quoted(dialect, &schema.name),
        quoted(dialect, pk),
        dialect.placeholder(1)
    );
    BuiltQuery { sql, params: vec![id.clone()] }
}

pub fn build_select_by_field(dialect: Dialect, schema: &EntitySchema, field: &str, value: &Value) -> BuiltQuery {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = {} LIMIT 1",
        quoted(dialect, &schema.name),
        quoted(dialect, field),
        dialect.placeholder(1)
    );
    BuiltQuery { sql, params: vec![value.clone()] }
}

/// Fields an `UPDATE` never writes: the primary key and `createdAt`.
fn is_immutable(schema: &EntitySchema, field_name: &str) -> bool {
    field_name == primary_key_name(schema) || field_name == "createdAt"
}

pub fn build_update(
    dialect: Dialect,
    schema: &EntitySchema,
    id: &Value,
    data: &Map<String, Value>,
) -> Result<BuiltQuery> {
    let columns: Vec<&str> = schema
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .filter(|name| data.contains_key(*name) && !is_immutable(schema, name))
        .collect();

    if columns.is_empty() {
        return Err(DbalError::validation(format!(
            "update for entity '{}' has no mutable columns",
            schema.name
        )));
    }

    let mut params = Vec::with_capacity(columns.len() + 1);
    let mut assignments = Vec::with_capacity(columns.len());
    let mut index = 1;
    for col in &columns {
        assignments.push(format!("{} = {}", quoted(dialect, col), dialect.placeholder(index)));
        params.push(data.get(*col).cloned().unwrap_or(Value::Null));
        index += 1;
    }

    let pk = primary_key_name(schema);
    let mut sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(dialect, &schema.name),
        assignments.join(", "),
        quoted(dialect, pk),
        dialect.placeholder(index)
    );
    params.push(id.clone());
    if dialect.supports_returning() {
        sql.push_str(" RETURNING *");
    }

    Ok(BuiltQuery { sql, params })
}

pub fn build_delete(dialect: Dialect, schema: &EntitySchema, id: &Value) -> BuiltQuery {
    let pk = primary_key_name(schema);
    let sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        quoted(dialect, &schema.name),
        quoted(dialect, pk),
        dialect.placeholder(1)
    );
    BuiltQuery { sql, params: vec![id.clone()] }
}

/// The default `LIST` page size when the caller specifies none.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub filters: Map<String, Value>,
    pub order_by: Option<String>,
    pub order_desc: bool,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

/// The default `ORDER BY` column: `createdAt` if the entity has it,
/// otherwise the primary key, otherwise the first declared field.
fn default_order_column(schema: &EntitySchema) -> &str {
    if schema.has_field("createdAt") {
        "createdAt"
    } else if let Some(pk) = schema.primary_field() {
        pk.name.as_str()
    } else {
        schema.first_field_name()
    }
}

pub fn build_list(dialect: Dialect, schema: &EntitySchema, options: &ListOptions) -> BuiltQuery {
    let mut params = Vec::new();
    let mut sql = format!("SELECT * FROM {}", quoted(dialect, &schema.name));

    if !options.filters.is_empty() {
        let mut clauses = Vec::with_capacity(options.filters.len());
        let mut index = 1;
        for (field, value) in options.filters.iter() {
            clauses.push(format!("{} = {}", quoted(dialect, field), dialect.placeholder(index)));
            params.push(value.clone());
            index += 1;
        }
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let order_col = options.order_by.as_deref().unwrap_or_else(|| default_order_column(schema));
    let order_desc = options.order_desc || (options.order_by.is_none() && order_col == "createdAt");
    sql.push_str(&format!(
        " ORDER BY {} {}",
        quoted(dialect, order_col),
        if order_desc { "DESC" } else { "ASC" }
    ));

    let limit = options.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let page = options.page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;
    sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));

    BuiltQuery { sql, params }
}

pub fn build_update_many(
    dialect: Dialect,
    schema: &EntitySchema,
    filters: &Map<String, Value>,
    data: &Map<String, Value>,
) -> Result<BuiltQuery> {
    let columns: Vec<&str> = schema
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .filter(|name| data.contains_key(*name) && !is_immutable(schema, name))
        .collect();
    if columns.is_empty() {
        return Err(DbalError::validation(format!(
            "update_many for entity '{}' has no mutable columns",
            schema.name
        )));
    }

    let mut params = Vec::new();
    let mut index = 1;
    let mut assignments = Vec::with_capacity(columns.len());
    for col in &columns {
        assignments.push(format!("{} = {}", quoted(dialect, col), dialect.placeholder(index)));
        params.push(data.get(*col).cloned().unwrap_or(Value::Null));
        index += 1;
    }

    let mut sql = format!(
        "UPDATE {} SET {}",
        quoted(dialect, &schema.name),
        assignments.join(", ")
    );
    if !filters.is_empty() {
        let mut clauses = Vec::with_capacity(filters.len());
        for (field, value) in filters.iter() {
            clauses.push(format!("{} = {}", quoted(dialect, field), dialect.placeholder(index)));
            params.push(value.clone());
            index += 1;
        }
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    Ok(BuiltQuery { sql, params })
}

pub fn build_delete_many(dialect: Dialect, schema: &EntitySchema, filters: &Map<String, Value>) -> BuiltQuery {
    let mut sql = format!("DELETE FROM {}", quoted(dialect, &schema.name));
    let mut params = Vec::new();
    if !filters.is_empty() {
        let mut clauses = Vec::with_capacity(filters.len());
        let mut index = 1;
        for (field, value) in filters.iter() {
            clauses.push(format!("{} = {}", quoted(dialect, field), dialect.placeholder(index)));
            params.push(value.clone());
            index += 1;
        }
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    BuiltQuery { sql, params }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Field, FieldType};
    use serde_json::json;

    fn post_schema() -> EntitySchema {
        let mut id = Field::new("id", FieldType::Uuid);
        id.primary = true;
        id.generated = true;
        let mut created_at = Field::new("createdAt", FieldType::Datetime);
        created_at.generated = true;
        let title = Field::new("title", FieldType::String);

        EntitySchema {
            name: "Post".to_string(),
            display_name: None,
            description: None,
            version: "1".to_string(),
            fields: vec![id, created_at, title],
            indexes: Vec::new(),
            relations: Vec::new(),
            metadata: Default::default(),
            acl: None,
        }
    }

    fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn insert_excludes_generated_fields_unless_provided() {
        let schema = post_schema();
        let data = obj(&[("title", json!("hello"))]);
        let q = build_insert(Dialect::Sqlite, &schema, &data).unwrap();
        assert!(!q.sql.contains("\"id\""));
        assert!(!q.sql.contains("\"createdAt\""));
        assert!(q.sql.contains("\"title\""));
    }

    #[test]
    fn insert_includes_generated_field_when_caller_provides_it() {
        let schema = post_schema();
        let data = obj(&[("id", json!("abc")), ("title", json!("hello"))]);
        let q = build_insert(Dialect::Sqlite, &schema, &data).unwrap();
        assert!(q.sql.contains("\"id\""));
    }

    #[test]
    fn update_excludes_primary_key_and_created_at() {
        let schema = post_schema();
        let data = obj(&[
            ("id", json!("ignored")),
            ("createdAt", json!("ignored")),
            ("title", json!("new title")),
        ]);
        let q = build_update(Dialect::Sqlite, &schema, &json!("abc"), &data).unwrap();
        assert!(q.sql.contains("\"title\" = ?"));
        assert!(!q.sql.contains("\"createdAt\" ="));
        assert!(q.sql.starts_with("UPDATE \"Post\" SET"));
    }

    #[test]
    fn postgres_update_appends_returning() {
        let schema = post_schema();
        let data = obj(&[("title", json!("x"))]);
        let q = build_update(Dialect::Postgres, &schema, &json!("abc"), &data).unwrap();
        assert!(q.sql.ends_with("RETURNING *"));
    }

    #[test]
    fn list_default_order_prefers_created_at() {
        let schema = post_schema();
        let q = build_list(Dialect::Sqlite, &schema, &ListOptions::default());
        assert!(q.sql.contains("ORDER BY \"createdAt\" DESC"));
        assert!(q.sql.contains(&format!("LIMIT {DEFAULT_LIST_LIMIT} OFFSET 0")));
    }

    #[test]
    fn list_default_order_falls_back_to_ascending_primary_key() {
        let mut id = Field::new("id", FieldType::Uuid);
        id.primary = true;
        let title = Field::new("title", FieldType::String);
        let schema = EntitySchema {
            name: "Tag".to_string(),
            display_name: None,
            description: None,
            version: "1".to_string(),
            fields: vec![id, title],
            indexes: Vec::new(),
            relations: Vec::new(),
            metadata: Default::default(),
            acl: None,
        };
        let q = build_list(Dialect::Sqlite, &schema, &ListOptions::default());
        assert!(q.sql.contains("ORDER BY \"id\" ASC"));
    }

    #[test]
    fn list_page_two_offsets_by_limit() {
        let schema = post_schema();
        let options = ListOptions { limit: Some(10), page: Some(3), ..Default::default() };
        let q = build_list(Dialect::Sqlite, &schema, &options);
        assert!(q.sql.contains("LIMIT 10 OFFSET 20"));
    }
}
