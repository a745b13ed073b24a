//! SQLite record store: one row per trade record, autoincrement ids.

use crate::domain::error::LedgerError;
use crate::domain::record::TradeRecord;
use crate::ports::config_port::ConfigPort;
use crate::ports::record_store_port::{RecordStore, StorageUsage};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_SQLITE_PATH: &str = "trade_records.sqlite";

const INSERT_RECORD: &str =
    "INSERT INTO trade_records (date, broker, profit, loss, difference, roi)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LedgerError> {
        let db_path = config.get_string_or("storage", "path", DEFAULT_SQLITE_PATH);
        let pool_size = config.get_int("storage", "pool_size", 4).max(1) as u32;
        Self::open(db_path, pool_size)
    }

    pub fn open<P: Into<PathBuf>>(path: P, pool_size: u32) -> Result<Self, LedgerError> {
        let path = path.into();
        let manager = SqliteConnectionManager::file(&path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| {
                LedgerError::storage(format!("failed to open {}: {}", path.display(), e))
            })?;

        let store = Self {
            pool,
            path: Some(path),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Private database that lives as long as the store. The pool holds a
    /// single connection that is never recycled, since every connection to
    /// `:memory:` is a separate database.
    pub fn in_memory() -> Result<Self, LedgerError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .map_err(|e: r2d2::Error| LedgerError::storage(e.to_string()))?;

        let store = Self { pool, path: None };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn initialize_schema(&self) -> Result<(), LedgerError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trade_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                broker TEXT NOT NULL,
                profit REAL NOT NULL,
                loss REAL NOT NULL,
                difference REAL NOT NULL,
                roi REAL
            );",
        )
        .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;
        Ok(())
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, LedgerError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| LedgerError::storage(e.to_string()))
    }
}

impl RecordStore for SqliteStore {
    fn load_all(&self) -> Result<Vec<TradeRecord>, LedgerError> {
        let conn = self.connection()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, date, broker, profit, loss, difference, roi
                 FROM trade_records
                 ORDER BY id ASC",
            )
            .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TradeRecord {
                    id: Some(row.get(0)?),
                    date: row.get(1)?,
                    broker: row.get(2)?,
                    profit: row.get(3)?,
                    loss: row.get(4)?,
                    difference: row.get(5)?,
                    roi: row.get(6)?,
                })
            })
            .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?);
        }

        Ok(records)
    }

    /// Delete and re-insert inside one transaction. Identifiers are
    /// reassigned by the table.
    fn save_all(&self, records: &[TradeRecord]) -> Result<(), LedgerError> {
        let mut conn = self.connection()?;

        let tx = conn
            .transaction()
            .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;

        tx.execute("DELETE FROM trade_records", [])
            .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;

        {
            let mut stmt = tx
                .prepare(INSERT_RECORD)
                .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;
            for record in records {
                stmt.execute(params![
                    record.date,
                    record.broker,
                    record.profit,
                    record.loss,
                    record.difference,
                    record.roi
                ])
                .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;
            }
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;

        debug!(records = records.len(), "replaced sqlite records");
        Ok(())
    }

    fn add(&self, record: &TradeRecord) -> Result<i64, LedgerError> {
        let conn = self.connection()?;
        conn.execute(
            INSERT_RECORD,
            params![
                record.date,
                record.broker,
                record.profit,
                record.loss,
                record.difference,
                record.roi
            ],
        )
        .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }

    fn clear(&self) -> Result<(), LedgerError> {
        let conn = self.connection()?;
        conn.execute("DELETE FROM trade_records", [])
            .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;
        Ok(())
    }

    fn usage(&self) -> Result<StorageUsage, LedgerError> {
        let conn = self.connection()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM trade_records", [], |row| row.get(0))
            .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;

        let bytes = match self.path {
            Some(_) => {
                let page_count: i64 = conn
                    .query_row("PRAGMA page_count", [], |row| row.get(0))
                    .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;
                let page_size: i64 = conn
                    .query_row("PRAGMA page_size", [], |row| row.get(0))
                    .map_err(|e: rusqlite::Error| LedgerError::storage(e.to_string()))?;
                Some((page_count * page_size) as u64)
            }
            None => None,
        };

        Ok(StorageUsage {
            records: count as usize,
            bytes,
        })
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite {}", path.display()),
            None => "sqlite :memory:".to_string(),
        }
    }
}
