//! Sightline common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the ingestion crates:
//! - Observation records decoded from inbound envelopes
//! - Request identity for audit correlation
//! - The error taxonomy surfaced by the pipeline
//! - Protocol constants

pub mod error;
pub mod id;
pub mod observation;
pub mod schema;

pub use error::ErrorKind;
pub use id::RequestId;
pub use observation::{Location, Observation};
pub use schema::{DEVICES_SEEN_EVENT, PROTOCOL_VERSION};

/// How long a store writer waits on a lock held by another writer.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
