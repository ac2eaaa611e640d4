//! Service settings.
//!
//! Every field has a default, so an absent or partial `settings.json` is
//! valid. Store and audit paths left unset are filled in from the data
//! directory during resolution.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub use sl_common::DEFAULT_BUSY_TIMEOUT_MS;

/// Default upper bound for an ingestion request body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Complete settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schema_version: String,
    pub store: StoreSettings,
    pub audit: AuditSettings,
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            store: StoreSettings::default(),
            audit: AuditSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

/// Embedded store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path of the SQLite database file.
    pub path: Option<PathBuf>,
    /// How long a write waits on a lock held by another writer.
    pub busy_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Audit log settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub path: Option<PathBuf>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub workers: usize,
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            workers: 4,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Semantic validation beyond what the JSON shape enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.busy_timeout_ms == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "store.busy_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.server.workers == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "server.workers",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "server.max_body_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.bind_addr()?;
        Ok(())
    }

    /// Parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidSetting {
                field: "server.bind",
                reason: format!("{:?}: {}", self.server.bind, e),
            })
    }
}
