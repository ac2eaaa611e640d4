//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve {0} directory")]
    DirUnavailable(&'static str),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("secrets file not found: {0}")]
    SecretsMissing(PathBuf),

    #[error("invalid secrets: {0}")]
    InvalidSecrets(String),

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}
