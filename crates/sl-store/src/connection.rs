//! Connection policy for the observation store.
//!
//! Connections are opened per operation and dropped when the operation ends;
//! nothing is pooled across requests.

use crate::error::{Result, StoreError};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::trace;

/// Where the store lives and how long writers wait on each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_millis(crate::DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn unavailable(path: &Path, err: impl std::fmt::Display) -> StoreError {
    StoreError::StorageUnavailable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Open the store, creating the file if it does not exist yet.
pub(crate) fn open_or_create(config: &StoreConfig) -> Result<Connection> {
    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| unavailable(parent, e))?;
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(&config.path, flags)
        .map_err(|e| unavailable(&config.path, e))?;
    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| unavailable(&config.path, e))?;
    Ok(conn)
}

/// Open an existing store for writing.
///
/// Never creates the file: a missing store is `StorageMissing`.
pub(crate) fn open_for_write(config: &StoreConfig) -> Result<Connection> {
    if !config.path.is_file() {
        return Err(StoreError::StorageMissing {
            path: config.path.clone(),
        });
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(&config.path, flags)
        .map_err(|e| unavailable(&config.path, e))?;
    apply_write_policy(&conn, config)?;
    Ok(conn)
}

/// Bounded busy-wait plus write-ahead logging, so concurrent writers queue
/// instead of failing and readers are never blocked by a writer.
fn apply_write_policy(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| unavailable(&config.path, e))?;

    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(|e| unavailable(&config.path, e))?;
    if !mode.eq_ignore_ascii_case("wal") {
        return Err(unavailable(
            &config.path,
            format!("journal_mode is {mode}, expected wal"),
        ));
    }

    trace!(
        path = %config.path.display(),
        busy_timeout_ms = config.busy_timeout.as_millis() as u64,
        journal_mode = %mode,
        "write policy applied"
    );
    Ok(())
}
