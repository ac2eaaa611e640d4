//! Sightline configuration loading and validation.
//!
//! This crate provides:
//! - Typed settings for the store, audit log, and HTTP server (settings.json)
//! - The validator token and shared secret (secrets.json)
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation of the resolved configuration

pub mod error;
pub mod resolve;
pub mod secrets;
pub mod settings;

pub use error::ConfigError;
pub use resolve::{resolve_config, ConfigPaths, IngestConfig};
pub use secrets::Secrets;
pub use settings::{AuditSettings, ServerSettings, Settings, StoreSettings};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
