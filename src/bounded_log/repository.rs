//! SQLite bounded store
//!
//! Database access layer for one capped table. Insert and eviction run in a
//! single transaction, serialized per store by an async mutex so two
//! concurrent appends can never both skip eviction.

use super::types::{LogEntry, LogEntryMeta, LogStore, NewEntry};
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;

/// Open (and create if missing) an SQLite database
pub async fn connect_sqlite(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// SqliteLogStore instance
pub struct SqliteLogStore {
    pool: SqlitePool,
    table: &'static str,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl SqliteLogStore {
    /// Create store on `table`, creating the table if needed
    ///
    /// `table` must be a plain identifier; it is interpolated into SQL.
    pub async fn new(pool: SqlitePool, table: &'static str, capacity: usize) -> Result<Self> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::Config(format!("invalid table name '{}'", table)));
        }
        if capacity == 0 {
            return Err(Error::Config(format!("capacity for '{}' must be at least 1", table)));
        }

        let store = Self {
            pool,
            table,
            capacity,
            write_lock: Mutex::new(()),
        };
        store.init_schema().await?;

        tracing::info!(table = table, capacity = capacity, "SQLite bounded store ready");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        // AUTOINCREMENT keeps ids strictly increasing even after eviction
        let create = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                created_at_epoch REAL NOT NULL,
                label TEXT,
                content_type TEXT,
                payload BLOB
            )
            "#,
            table = self.table
        );
        sqlx::query(&create).execute(&self.pool).await?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_recent ON {table} (created_at_epoch DESC, id DESC)",
            table = self.table
        );
        sqlx::query(&index).execute(&self.pool).await?;

        Ok(())
    }

    pub fn table(&self) -> &'static str {
        self.table
    }
}

#[async_trait]
impl LogStore for SqliteLogStore {
    async fn append(&self, entry: NewEntry) -> Result<i64> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let insert = format!(
            "INSERT INTO {} (created_at, created_at_epoch, label, content_type, payload) VALUES (?, ?, ?, ?, ?)",
            self.table
        );
        let id = sqlx::query(&insert)
            .bind(&entry.created_at)
            .bind(entry.created_at_epoch)
            .bind(&entry.label)
            .bind(&entry.content_type)
            .bind(&entry.payload)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(&mut *tx)
            .await?;

        let excess = count - self.capacity as i64;
        if excess > 0 {
            let evict = format!(
                "DELETE FROM {table} WHERE id IN (SELECT id FROM {table} ORDER BY id ASC LIMIT ?)",
                table = self.table
            );
            let evicted = sqlx::query(&evict)
                .bind(excess)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            tracing::debug!(table = self.table, evicted = evicted, "Evicted oldest rows");
        }

        tx.commit().await?;

        tracing::debug!(table = self.table, id = id, "Row appended");
        Ok(id)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let query = format!(
            "SELECT id, created_at, created_at_epoch, label, content_type, payload FROM {} ORDER BY created_at_epoch DESC, id DESC LIMIT ?",
            self.table
        );
        let rows = sqlx::query_as::<_, LogEntry>(&query)
            .bind(limit.min(i64::MAX as usize) as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn list_recent_meta(&self, limit: usize) -> Result<Vec<LogEntryMeta>> {
        let query = format!(
            "SELECT id, created_at, created_at_epoch, label, content_type, COALESCE(LENGTH(payload), 0) AS payload_len FROM {} ORDER BY created_at_epoch DESC, id DESC LIMIT ?",
            self.table
        );
        let rows = sqlx::query_as::<_, LogEntryMeta>(&query)
            .bind(limit.min(i64::MAX as usize) as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn get(&self, id: i64) -> Result<Option<LogEntry>> {
        let query = format!(
            "SELECT id, created_at, created_at_epoch, label, content_type, payload FROM {} WHERE id = ?",
            self.table
        );
        let row = sqlx::query_as::<_, LogEntry>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as usize)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
