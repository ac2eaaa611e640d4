//! Observation table schema.
//!
//! Idempotency is decided by the store, not by the presence of the file: a
//! file created for any other reason still gets the table. A present table
//! is detected with a plain read, so the common path never takes the write
//! lock. When the table is missing, the re-check and the creation run inside
//! one IMMEDIATE transaction, and the `IF NOT EXISTS` clause stays as the
//! final guard for callers racing on a brand-new file.

use crate::connection::{open_or_create, StoreConfig};
use crate::error::{Result, StoreError};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

/// Name of the table observations are appended to.
pub const TABLE_NAME: &str = "data";

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    apMac TEXT,
    clientMac TEXT,
    ipv4 TEXT,
    ipv6 TEXT,
    seenTime TEXT,
    seenEpoch INTEGER,
    ssid TEXT,
    rssi TEXT,
    manufacturer TEXT,
    os TEXT,
    location_lat REAL,
    location_lng REAL,
    location_unc REAL
)";

/// What `ensure_schema` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// This call created the table.
    Created,
    /// The table was already there; nothing was changed.
    AlreadyPresent,
}

impl std::fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaStatus::Created => write!(f, "created"),
            SchemaStatus::AlreadyPresent => write!(f, "already_present"),
        }
    }
}

/// Ensures the `data` table exists.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    config: StoreConfig,
}

impl SchemaManager {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create the `data` table if it is absent.
    ///
    /// Safe to call from any number of concurrent requests.
    pub fn ensure_schema(&self) -> Result<SchemaStatus> {
        let mut conn = open_or_create(&self.config)?;
        let status = create_if_absent(&mut conn)?;
        match status {
            SchemaStatus::Created => info!(
                path = %self.config.path.display(),
                table = TABLE_NAME,
                "created store table"
            ),
            SchemaStatus::AlreadyPresent => debug!(
                path = %self.config.path.display(),
                table = TABLE_NAME,
                "store table already present"
            ),
        }
        Ok(status)
    }

    /// Whether the table exists, without creating anything.
    pub fn table_exists(&self) -> Result<bool> {
        if !self.config.path.is_file() {
            return Ok(false);
        }
        let conn = open_or_create(&self.config)?;
        table_present(&conn).map_err(|e| StoreError::StorageUnavailable {
            path: self.config.path.clone(),
            reason: e.to_string(),
        })
    }
}

fn table_present(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![TABLE_NAME],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

fn create_if_absent(conn: &mut Connection) -> Result<SchemaStatus> {
    let failed = |e: rusqlite::Error| StoreError::SchemaCreationFailed {
        reason: e.to_string(),
    };

    // Readers never take the write lock; only a missing table does.
    if table_present(conn).map_err(failed)? {
        return Ok(SchemaStatus::AlreadyPresent);
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(failed)?;
    if table_present(&tx).map_err(failed)? {
        return Ok(SchemaStatus::AlreadyPresent);
    }
    tx.execute_batch(CREATE_TABLE_SQL).map_err(failed)?;
    tx.commit().map_err(failed)?;
    Ok(SchemaStatus::Created)
}
