//! The SQL adapter: schema-driven CRUD plus list/bulk operations and
//! transactions, backed by a single `libsql` connection.

pub mod connection;
pub mod dialect;
pub mod query_builder;
pub mod result_parser;
pub mod transaction;
pub mod type_converter;

use std::sync::Arc;

use serde_json::{Map, Value};

pub use connection::SqlConnection;
pub use dialect::Dialect;
pub use query_builder::ListOptions;
pub use transaction::TransactionGuard;

use crate::error::{DbalError, Result};
use crate::schema::types::EntitySchema;
use crate::tenant::{Action, TenantContext};

/// Facade over one connection, dispatching schema-built SQL through it.
pub struct SqlAdapter {
    conn: Arc<SqlConnection>,
    dialect: Dialect,
}

fn to_bound_params(values: &[Value]) -> Vec<String> {
    values.iter().map(type_converter::json_to_sql_param).collect()
}

fn approx_json_size(value: &Value) -> u64 {
    serde_json::to_vec(value).map(|bytes| bytes.len() as u64).unwrap_or(0)
}

impl SqlAdapter {
    pub fn new(conn: Arc<SqlConnection>, dialect: Dialect) -> Self {
        Self { conn, dialect }
    }

    pub async fn begin(&self) -> Result<TransactionGuard> {
        TransactionGuard::begin(self.conn.clone()).await
    }

    async fn fetch_one(&self, sql: &str, params: Vec<String>, schema: &EntitySchema) -> Result<Option<Value>> {
        let mut rows = self.conn.query_rows(sql, params, |row| result_parser::row_to_json(row, schema)).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }

    async fn fetch_all(&self, sql: &str, params: Vec<String>, schema: &EntitySchema) -> Result<Vec<Value>> {
        self.conn.query_rows(sql, params, |row| result_parser::row_to_json(row, schema)).await
    }

    fn require_object(data: &Value) -> Result<&Map<String, Value>> {
        data.as_object()
            .ok_or_else(|| DbalError::validation("record data must be a JSON object".to_string()))
    }

    /// Create one record, returning the row as written.
    pub async fn create(&self, ctx: &mut TenantContext, schema: &EntitySchema, data: &Value) -> Result<Value> {
        ctx.authorize(Action::Write, &schema.name)?;
        let map = Self::require_object(data)?;
        ctx.quota.check_create_record()?;
        let data_size = approx_json_size(data);
        ctx.quota.check_data_size(data_size)?;

        let built = query_builder::build_insert(self.dialect, schema, map)?;
        let params = to_bound_params(&built.params);

        let created = if self.dialect.supports_returning() {
            self.fetch_one(&built.sql, params, schema)
                .await?
                .ok_or_else(|| DbalError::internal("insert with RETURNING produced no row".to_string()))?
        } else {
            let pk = schema.primary_field().map(|f| f.name.as_str());
            match pk.and_then(|name| map.get(name)) {
                Some(id) => {
                    self.conn.execute(&built.sql, params).await?;
                    self.find_by_id(schema, id)
                        .await?
                        .ok_or_else(|| DbalError::internal("insert succeeded but row is unreadable".to_string()))?
                }
                None => {
                    let (_changed, rowid) = self.conn.execute_and_last_insert_rowid(&built.sql, params).await?;
                    self.fetch_one(
                        &format!("SELECT * FROM {} WHERE rowid = ?", self.dialect.quote_ident(&schema.name)),
                        vec![rowid.to_string()],
                        schema,
                    )
                    .await?
                    .ok_or_else(|| DbalError::internal("insert succeeded but row is unreadable".to_string()))?
                }
            }
        };

        ctx.quota.record_created(data_size);
        Ok(created)
    }

    pub async fn find_by_id(&self, schema: &EntitySchema, id: &Value) -> Result<Option<Value>> {
        let built = query_builder::build_select_by_id(self.dialect, schema, id);
        self.fetch_one(&built.sql, to_bound_params(&built.params), schema).await
    }

    /// Read one record, `NotFound` if absent.
    pub async fn read(&self, ctx: &TenantContext, schema: &EntitySchema, id: &Value) -> Result<Value> {
        ctx.authorize(Action::Read, &schema.name)?;
        self.find_by_id(schema, id)
            .await?
            .ok_or_else(|| DbalError::not_found(format!("{} {:?}", schema.name, id)))
    }

    pub async fn find_first(
        &self,
        ctx: &TenantContext,
        schema: &EntitySchema,
        options: &ListOptions,
    ) -> Result<Option<Value>> {
        ctx.authorize(Action::Read, &schema.name)?;
        let mut narrowed = options.clone();
        narrowed.limit = Some(1);
        narrowed.page = Some(1);
        let built = query_builder::build_list(self.dialect, schema, &narrowed);
        let rows = self.fetch_all(&built.sql, to_bound_params(&built.params), schema).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn find_by_field(
        &self,
        ctx: &TenantContext,
        schema: &EntitySchema,
        field: &str,
        value: &Value,
    ) -> Result<Option<Value>> {
        ctx.authorize(Action::Read, &schema.name)?;
        let built = query_builder::build_select_by_field(self.dialect, schema, field, value);
        self.fetch_one(&built.sql, to_bound_params(&built.params), schema).await
    }

    /// Update one record by id. `NotFound` if it does not already exist.
    pub async fn update(&self, ctx: &mut TenantContext, schema: &EntitySchema, id: &Value, data: &Value) -> Result<Value> {
        ctx.authorize(Action::Write, &schema.name)?;
        let map = Self::require_object(data)?;
        let data_size = approx_json_size(data);
        ctx.quota.check_data_size(data_size)?;
        let built = query_builder::build_update(self.dialect, schema, id, map)?;
        let params = to_bound_params(&built.params);

        if self.dialect.supports_returning() {
            return self
                .fetch_one(&built.sql, params, schema)
                .await?
                .ok_or_else(|| DbalError::not_found(format!("{} {:?}", schema.name, id)));
        }

        let changed = self.conn.execute(&built.sql, params).await?;
        if changed == 0 {
            return Err(DbalError::not_found(format!("{} {:?}", schema.name, id)));
        }
        self.find_by_id(schema, id)
            .await?
            .ok_or_else(|| DbalError::not_found(format!("{} {:?}", schema.name, id)))
    }

    /// Remove one record by id. `NotFound` if it does not exist.
    pub async fn remove(&self, ctx: &mut TenantContext, schema: &EntitySchema, id: &Value) -> Result<()> {
        ctx.authorize(Action::Delete, &schema.name)?;
        let existing = self.find_by_id(schema, id).await?;
        let built = query_builder::build_delete(self.dialect, schema, id);
        let changed = self.conn.execute(&built.sql, to_bound_params(&built.params)).await?;
        if changed == 0 {
            return Err(DbalError::not_found(format!("{} {:?}", schema.name, id)));
        }
        let removed_size = existing.as_ref().map(approx_json_size).unwrap_or(0);
        ctx.quota.record_removed(removed_size);
        Ok(())
    }

    /// List records. `total` reflects the number of rows returned in this
    /// page, not the full matching count: computing a true total would
    /// require a second `COUNT(*)` query this adapter does not issue.
    pub async fn list(&self, ctx: &TenantContext, schema: &EntitySchema, options: &ListOptions) -> Result<Vec<Value>> {
        ctx.authorize(Action::Read, &schema.name)?;
        if let Some(limit) = options.limit {
            ctx.quota.check_list_length(limit.into())?;
        }
        let built = query_builder::build_list(self.dialect, schema, options);
        self.fetch_all(&built.sql, to_bound_params(&built.params), schema).await
    }

    /// Create many records. Each record is created independently; a
    /// failure on one record is collected rather than aborting the batch,
    /// so callers get partial success with per-record errors.
    pub async fn create_many(
        &self,
        ctx: &mut TenantContext,
        schema: &EntitySchema,
        records: &[Value],
    ) -> Vec<Result<Value>> {
        if let Err(e) = ctx.quota.check_list_length(records.len() as u64) {
            return vec![Err(e)];
        }
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            out.push(self.create(ctx, schema, record).await);
        }
        out
    }

    pub async fn update_many(
        &self,
        ctx: &mut TenantContext,
        schema: &EntitySchema,
        filters: &Map<String, Value>,
        data: &Value,
    ) -> Result<u64> {
        ctx.authorize(Action::Write, &schema.name)?;
        let map = Self::require_object(data)?;
        let built = query_builder::build_update_many(self.dialect, schema, filters, map)?;
        self.conn.execute(&built.sql, to_bound_params(&built.params)).await
    }

    pub async fn delete_many(&self, ctx: &mut TenantContext, schema: &EntitySchema, filters: &Map<String, Value>) -> Result<u64> {
        ctx.authorize(Action::Delete, &schema.name)?;
        let built = query_builder::build_delete_many(self.dialect, schema, filters);
        self.conn.execute(&built.sql, to_bound_params(&built.params)).await
    }

    /// Create-or-update by a unique (non-primary) field. Not transactional:
    /// the lookup and the subsequent write are two round trips, so a
    /// concurrent delete between them can turn an intended update into an
    /// insert.
    pub async fn upsert(
        &self,
        ctx: &mut TenantContext,
        schema: &EntitySchema,
        uniq_field: &str,
        uniq_val: &Value,
        create_data: &Value,
        update_data: &Value,
    ) -> Result<Value> {
        match self.find_by_field(ctx, schema, uniq_field, uniq_val).await? {
            Some(existing) => {
                let id = schema
                    .primary_field()
                    .and_then(|pk| existing.get(&pk.name))
                    .cloned()
                    .ok_or_else(|| DbalError::internal("existing row is missing its primary key".to_string()))?;
                self.update(ctx, schema, &id, update_data).await
            }
            None => {
                let mut map = Self::require_object(create_data)?.clone();
                map.insert(uniq_field.to_string(), uniq_val.clone());
                self.create(ctx, schema, &Value::Object(map)).await
            }
        }
    }
}
