//! Connection setup and the mutex that serializes access to it
//!
//! `libsql::Connection` is not `Sync` across concurrent statement
//! execution, so every access to it funnels through one `tokio::sync::Mutex`
//! per connection. The lock is held for the duration of a single
//! prepare/bind/step/finalize sequence — including, for queries, the row
//! stepping that follows — never across an `.await` boundary that waits on
//! anything else.

use std::sync::Arc;
use std::time::Duration;

use libsql::{Builder, Connection, Database};
use tokio::sync::Mutex;

use crate::error::translators::sqlite_error_to_dbal;
use crate::error::Result;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// An open connection plus the mutex serializing statement execution on it.
pub struct SqlConnection {
    #[allow(dead_code)]
    database: Arc<Database>,
    conn: Mutex<Connection>,
}

impl SqlConnection {
    /// Open (creating if absent) a local SQLite/libsql database file at
    /// `path`, apply the standard PRAGMAs, and wrap the connection.
    pub async fn open_local(path: &str) -> Result<Self> {
        let database = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| sqlite_error_to_dbal(&e, "opening database"))?;

        let conn = tokio::time::timeout(DEFAULT_CONNECT_TIMEOUT, async {
            database.connect()
        })
        .await
        .map_err(|_| crate::error::DbalError::timeout("connecting to database"))?
        .map_err(|e| sqlite_error_to_dbal(&e, "connecting to database"))?;

        let connection = Self {
            database: Arc::new(database),
            conn: Mutex::new(conn),
        };
        connection.apply_pragmas().await?;
        Ok(connection)
    }

    async fn execute_pragma(&self, statement: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(statement, ())
            .await
            .map_err(|e| sqlite_error_to_dbal(&e, "applying pragma"))?;
        while rows
            .next()
            .await
            .map_err(|e| sqlite_error_to_dbal(&e, "applying pragma"))?
            .is_some()
        {}
        Ok(())
    }

    async fn apply_pragmas(&self) -> Result<()> {
        self.execute_pragma("PRAGMA journal_mode = WAL").await?;
        self.execute_pragma("PRAGMA foreign_keys = ON").await?;
        self.execute_pragma(&format!("PRAGMA busy_timeout = {DEFAULT_BUSY_TIMEOUT_MS}"))
            .await?;
        Ok(())
    }

    /// Run `statement` with the given bound string parameters, returning
    /// the number of rows changed.
    pub async fn execute(&self, statement: &str, params: Vec<String>) -> Result<u64> {
        let conn = self.conn.lock().await;
        conn.execute(statement, params)
            .await
            .map_err(|e| sqlite_error_to_dbal(&e, statement))
    }

    /// Run `statement`, then read `last_insert_rowid` off the same
    /// connection state it produced — both under one lock acquisition, so
    /// no other statement can run (and change the rowid) in between.
    pub async fn execute_and_last_insert_rowid(&self, statement: &str, params: Vec<String>) -> Result<(u64, i64)> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(statement, params)
            .await
            .map_err(|e| sqlite_error_to_dbal(&e, statement))?;
        Ok((changed, conn.last_insert_rowid()))
    }

    /// Run a query and materialize every row with `row_fn`, holding the
    /// connection lock for the full prepare/bind/step sequence — including
    /// stepping through the cursor, not just preparing it.
    pub async fn query_rows<T>(
        &self,
        statement: &str,
        params: Vec<String>,
        mut row_fn: impl FnMut(&libsql::Row) -> Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(statement, params)
            .await
            .map_err(|e| sqlite_error_to_dbal(&e, statement))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| sqlite_error_to_dbal(&e, "reading row"))?
        {
            out.push(row_fn(&row)?);
        }
        Ok(out)
    }

    pub async fn changes(&self) -> u64 {
        let conn = self.conn.lock().await;
        conn.changes()
    }

    pub(crate) fn lock(&self) -> &Mutex<Connection> {
        &self.conn
    }
}
