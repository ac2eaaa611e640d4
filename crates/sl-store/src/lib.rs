//! Sightline observation storage.
//!
//! This crate provides:
//! - Idempotent creation of the `data` table
//! - A single-row, parameterized insert path with a bounded busy-wait
//! - Store errors mapped onto the shared error taxonomy

pub mod connection;
pub mod error;
pub mod schema;
pub mod writer;

pub use connection::StoreConfig;
pub use error::StoreError;
pub use sl_common::DEFAULT_BUSY_TIMEOUT_MS;
pub use schema::{SchemaManager, SchemaStatus, TABLE_NAME};
pub use writer::{InsertReceipt, InsertStatement, RecordWriter, SqlValue};
