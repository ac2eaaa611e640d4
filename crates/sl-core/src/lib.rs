//! Sightline ingestion core.
//!
//! Receives `DevicesSeen` telemetry envelopes over HTTP, checks protocol
//! version and shared secret, and appends one row per observation to the
//! embedded store.
//!
//! Control flow: [`server`] → [`dispatch::Dispatcher`] →
//! [`validate::PayloadValidator`] → `sl_store::SchemaManager` →
//! `sl_store::RecordWriter`.

pub mod audit;
pub mod cli;
pub mod dispatch;
pub mod exit_codes;
pub mod logging;
pub mod server;
pub mod validate;

pub use audit::{AuditEntry, AuditLog, FileAuditLog, MemoryAuditLog};
pub use dispatch::{
    DispatchOutcome, Dispatcher, InboundRequest, IngestError, OutcomeKind, ResponseStatus,
};
pub use exit_codes::ExitCode;
pub use server::{IngestServer, ServeError};
pub use validate::{EventKind, PayloadValidator, ValidatedEnvelope, ValidationError};
