use std::sync::Arc;

use futures::lock::{Mutex, MutexGuard};

use crate::config::DatabaseConfig;
use crate::database::{Database, ReturnId, Row};
use crate::error::Result;
use crate::statement::ColumnValueMap;

/// Cloneable handle serializing access to one [`Database`] across tasks.
///
/// Every clone refers to the same connection. Calls block the executor for
/// the duration of the statement, like the underlying engine call does.
#[derive(Clone, Debug)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn new(database: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(database)),
        }
    }

    /// Exclusive access for a sequence of calls that must not interleave.
    pub async fn lock(&self) -> MutexGuard<'_, Database> {
        self.inner.lock().await
    }

    pub async fn connect(&self, config: &DatabaseConfig) -> Result<()> {
        self.inner.lock().await.connect(config)
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_connected()
    }

    pub async fn select(&self, sql: &str) -> Result<Vec<Row>> {
        self.inner.lock().await.select(sql)
    }

    pub async fn row(&self, sql: &str) -> Result<Row> {
        self.inner.lock().await.row(sql)
    }

    pub async fn insert(
        &self,
        table: &str,
        data: &ColumnValueMap,
        return_id: impl Into<ReturnId>,
    ) -> Result<i64> {
        self.inner.lock().await.insert(table, data, return_id)
    }

    pub async fn update(
        &self,
        table: &str,
        data: &ColumnValueMap,
        where_clause: &str,
    ) -> Result<bool> {
        self.inner.lock().await.update(table, data, where_clause)
    }

    pub async fn delete(&self, table: &str, where_clause: &str) -> Result<bool> {
        self.inner.lock().await.delete(table, where_clause)
    }

    pub async fn execute(&self, sql: &str) -> Result<usize> {
        self.inner.lock().await.execute(sql)
    }
}

impl From<Database> for SharedDatabase {
    fn from(database: Database) -> Self {
        Self::new(database)
    }
}
