//! Error types for store operations.

use sl_common::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while creating the schema or writing a row.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store file could not be opened or configured
    #[error("store unavailable at {path}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },

    /// The table creation statement failed
    #[error("failed to create store table: {reason}")]
    SchemaCreationFailed { reason: String },

    /// The store file does not exist on the write path
    #[error("store does not exist: {path}")]
    StorageMissing { path: PathBuf },

    /// The insert statement failed
    #[error("insert failed: {reason} [{statement}]")]
    InsertFailed { statement: String, reason: String },
}

impl StoreError {
    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            StoreError::SchemaCreationFailed { .. } => ErrorKind::SchemaCreationFailed,
            StoreError::StorageMissing { .. } => ErrorKind::StorageMissing,
            StoreError::InsertFailed { .. } => ErrorKind::InsertFailed,
        }
    }

    /// Short message safe to return to the caller.
    pub fn client_message(&self) -> &'static str {
        match self {
            StoreError::StorageUnavailable { .. } => "Error: unable to write to store",
            StoreError::SchemaCreationFailed { .. } => "Failed to create store table",
            StoreError::StorageMissing { .. } => "Error: store does not exist",
            StoreError::InsertFailed { .. } => "Failed to insert into store",
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
