//! Append-only audit trail.
//!
//! Every request leaves timestamped free-text entries: probe validations,
//! envelope summaries, each insert attempt with its SQL and parameters, and
//! every failure with its detail. Entries contain client data and must be
//! handled as sensitive.

use chrono::{DateTime, Local};
use sl_common::RequestId;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors from audit log operations.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single audit line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Local>,
    pub request_id: RequestId,
    pub message: String,
}

impl AuditEntry {
    pub fn new(request_id: &RequestId, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            request_id: request_id.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // One entry per line, whatever the client put in its fields.
        let message = self.message.replace('\r', "\\r").replace('\n', "\\n");
        write!(
            f,
            "{}: {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.request_id,
            message
        )
    }
}

/// Sink for audit entries.
pub trait AuditLog: Send + Sync {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Audit log appended to a plain-text file.
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    /// Open (creating if needed) the audit file at `path`.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AuditError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let log = Self {
            path: path.to_path_buf(),
        };
        log.append_file()?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_file(&self) -> Result<fs::File, AuditError> {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AuditError::Io {
                path: self.path.clone(),
                source: e,
            })
    }
}

impl AuditLog for FileAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut file = self.append_file()?;
        // Single write per entry so concurrent appenders do not interleave.
        let line = format!("{}\n", entry);
        file.write_all(line.as_bytes()).map_err(|e| AuditError::Io {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// In-memory audit log, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }
}

impl AuditLog for MemoryAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
        Ok(())
    }
}
