//! Error taxonomy for the ingestion pipeline.
//!
//! Each crate keeps its own `thiserror` enum; all of them map onto an
//! [`ErrorKind`] so the dispatcher and the audit log speak one vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of failure that terminated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // Validation errors (20-29)
    MalformedPayload,
    UnsupportedVersion,
    Unauthorized,

    // Storage errors (30-39)
    StorageUnavailable,
    SchemaCreationFailed,
    StorageMissing,
    InsertFailed,
}

impl ErrorKind {
    /// Returns the stable numeric code for this error kind.
    /// Used in audit entries and structured logs.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::MalformedPayload => 20,
            ErrorKind::UnsupportedVersion => 21,
            ErrorKind::Unauthorized => 22,
            ErrorKind::StorageUnavailable => 30,
            ErrorKind::SchemaCreationFailed => 31,
            ErrorKind::StorageMissing => 32,
            ErrorKind::InsertFailed => 33,
        }
    }

    /// True for failures caused by the request content rather than the store.
    pub fn is_validation(self) -> bool {
        self.code() < 30
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPayload => write!(f, "malformed_payload"),
            Self::UnsupportedVersion => write!(f, "unsupported_version"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::StorageUnavailable => write!(f, "storage_unavailable"),
            Self::SchemaCreationFailed => write!(f, "schema_creation_failed"),
            Self::StorageMissing => write!(f, "storage_missing"),
            Self::InsertFailed => write!(f, "insert_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_kinds() {
        assert!(ErrorKind::MalformedPayload.is_validation());
        assert!(ErrorKind::Unauthorized.is_validation());
        assert!(!ErrorKind::InsertFailed.is_validation());
        assert!(!ErrorKind::StorageMissing.is_validation());
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&ErrorKind::SchemaCreationFailed).unwrap();
        assert_eq!(json, format!("\"{}\"", ErrorKind::SchemaCreationFailed));
    }
}
