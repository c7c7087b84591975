//! Transaction lifecycle and nested savepoints
//!
//! Rust has no `async Drop`, so [`TransactionGuard`]'s automatic rollback on
//! scope exit is best-effort: it detaches a `tokio::spawn`ed rollback and
//! logs a warning, rather than blocking `Drop` on an `.await` it cannot
//! perform. Callers that need a guaranteed rollback before continuing
//! should call [`TransactionGuard::rollback`] explicitly.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use super::connection::SqlConnection;
use crate::error::Result;

pub struct TransactionGuard {
    conn: Arc<SqlConnection>,
    in_transaction: AtomicBool,
    savepoint_depth: AtomicU32,
}

impl TransactionGuard {
    pub async fn begin(conn: Arc<SqlConnection>) -> Result<Self> {
        conn.execute("BEGIN", Vec::new()).await?;
        Ok(Self {
            conn,
            in_transaction: AtomicBool::new(true),
            savepoint_depth: AtomicU32::new(0),
        })
    }

    pub fn is_active(&self) -> bool {
        self.in_transaction.load(Ordering::SeqCst)
    }

    pub async fn commit(&self) -> Result<()> {
        if !self.in_transaction.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.conn.execute("COMMIT", Vec::new()).await?;
        Ok(())
    }

    pub async fn rollback(&self) -> Result<()> {
        if !self.in_transaction.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.conn.execute("ROLLBACK", Vec::new()).await?;
        Ok(())
    }

    /// Open a nested savepoint, named `sp_<depth>` by convention.
    pub async fn savepoint(&self) -> Result<String> {
        let depth = self.savepoint_depth.fetch_add(1, Ordering::SeqCst) + 1;
        let name = format!("sp_{depth}");
        self.conn.execute(&format!("SAVEPOINT {name}"), Vec::new()).await?;
        Ok(name)
    }

    pub async fn release_savepoint(&self, name: &str) -> Result<()> {
        self.conn.execute(&format!("RELEASE SAVEPOINT {name}"), Vec::new()).await?;
        Ok(())
    }

    pub async fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        self.conn
            .execute(&format!("ROLLBACK TO SAVEPOINT {name}"), Vec::new())
            .await?;
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if !self.in_transaction.swap(false, Ordering::SeqCst) {
            return;
        }
        let conn = self.conn.clone();
        tracing::warn!("transaction guard dropped while active, rolling back in background");
        tokio::spawn(async move {
            if let Err(e) = conn.execute("ROLLBACK", Vec::new()).await {
                tracing::error!(error = %e, "background rollback on drop failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn begin_commit_round_trip() {
        let conn = Arc::new(SqlConnection::open_local(":memory:").await.unwrap());
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", Vec::new())
            .await
            .unwrap();
        let tx = TransactionGuard::begin(conn.clone()).await.unwrap();
        conn.execute("INSERT INTO t (id) VALUES (1)", Vec::new()).await.unwrap();
        tx.commit().await.unwrap();
        assert!(!tx.is_active());
    }

    #[tokio::test]
    async fn rollback_undoes_writes_in_scope() {
        let conn = Arc::new(SqlConnection::open_local(":memory:").await.unwrap());
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", Vec::new())
            .await
            .unwrap();
        let tx = TransactionGuard::begin(conn.clone()).await.unwrap();
        conn.execute("INSERT INTO t (id) VALUES (1)", Vec::new()).await.unwrap();
        tx.rollback().await.unwrap();

        let counts = conn
            .query_rows("SELECT COUNT(*) FROM t", Vec::new(), |row| {
                Ok(row.get::<i64>(0).expect("count column"))
            })
            .await
            .unwrap();
        assert_eq!(counts[0], 0);
    }

    #[tokio::test]
    async fn nested_savepoint_rolls_back_independently() {
        let conn = Arc::new(SqlConnection::open_local(":memory:").await.unwrap());
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", Vec::new())
            .await
            .unwrap();
        let tx = TransactionGuard::begin(conn.clone()).await.unwrap();
        conn.execute("INSERT INTO t (id) VALUES (1)", Vec::new()).await.unwrap();
        let sp = tx.savepoint().await.unwrap();
        conn.execute("INSERT INTO t (id) VALUES (2)", Vec::new()).await.unwrap();
        tx.rollback_to_savepoint(&sp).await.unwrap();
        tx.commit().await.unwrap();

        let counts = conn
            .query_rows("SELECT COUNT(*) FROM t", Vec::new(), |row| {
                Ok(row.get::<i64>(0).expect("count column"))
            })
            .await
            .unwrap();
        assert_eq!(counts[0], 1);
    }
}
