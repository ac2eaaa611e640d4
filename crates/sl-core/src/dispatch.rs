//! Request dispatcher.
//!
//! Classifies each request and drives the pipeline to one of two terminal
//! answers, 200 or 400:
//! - empty body: liveness probe, answered with the validator token
//! - non-empty body: validate, ensure the schema once, write each
//!   observation in payload order
//!
//! Any failure stops the request. Rows already written stay written.

use crate::audit::{AuditEntry, AuditLog};
use crate::validate::{EventKind, PayloadValidator, ValidationError};
use sl_common::{ErrorKind, RequestId};
use sl_config::IngestConfig;
use sl_store::{RecordWriter, SchemaManager, SchemaStatus, StoreConfig, StoreError, TABLE_NAME};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Any failure that terminates an ingestion request.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Validation(e) => e.kind(),
            IngestError::Storage(e) => e.kind(),
        }
    }

    /// Short message safe to return to the caller.
    pub fn client_message(&self) -> &'static str {
        match self {
            IngestError::Validation(e) => e.client_message(),
            IngestError::Storage(e) => e.client_message(),
        }
    }
}

/// HTTP status of a dispatch outcome. Nothing else is ever returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    BadRequest,
}

impl ResponseStatus {
    pub fn code(self) -> u16 {
        match self {
            ResponseStatus::Ok => 200,
            ResponseStatus::BadRequest => 400,
        }
    }
}

/// What happened to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    Probe,
    Ingested { rows: usize },
    Ignored { event_type: String },
    Rejected { kind: ErrorKind },
}

/// Response plus bookkeeping for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub request_id: RequestId,
    pub status: ResponseStatus,
    pub body: String,
    pub kind: OutcomeKind,
}

/// A request as seen by the dispatcher, independent of the HTTP library.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub method: String,
    pub body: Vec<u8>,
}

impl InboundRequest {
    pub fn new(method: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: method.into(),
            body: body.into(),
        }
    }
}

/// Drives one request through validation and storage.
///
/// Holds only immutable configuration and the audit sink; every store
/// connection is opened and closed within a single call.
pub struct Dispatcher {
    validator_token: String,
    validator: PayloadValidator,
    schema: SchemaManager,
    writer: RecordWriter,
    audit: Arc<dyn AuditLog>,
}

impl Dispatcher {
    pub fn new(config: &IngestConfig, audit: Arc<dyn AuditLog>) -> Self {
        let store = StoreConfig::new(&config.store_path).with_busy_timeout(Duration::from_millis(
            config.settings.store.busy_timeout_ms,
        ));
        Self {
            validator_token: config.secrets.validator().to_string(),
            validator: PayloadValidator::new(
                config.secrets.secret(),
                config.settings.server.max_body_bytes,
            ),
            schema: SchemaManager::new(store.clone()),
            writer: RecordWriter::new(store),
            audit,
        }
    }

    /// Upper bound the HTTP layer should read before handing over a body.
    pub fn max_body_bytes(&self) -> usize {
        self.validator.max_body_bytes()
    }

    /// Handle a request end to end.
    pub fn handle(&self, request: &InboundRequest) -> DispatchOutcome {
        let request_id = RequestId::new();
        let span = info_span!("request", id = %request_id, method = %request.method);
        let _guard = span.enter();

        if request.body.is_empty() {
            return self.probe(request_id);
        }

        debug!(bytes = request.body.len(), "ingestion request");
        match self.ingest(&request_id, &request.body) {
            Ok(kind) => DispatchOutcome {
                request_id,
                status: ResponseStatus::Ok,
                body: String::new(),
                kind,
            },
            Err(err) => self.reject(request_id, err),
        }
    }

    /// Terminate a request with a client error, auditing the full detail.
    pub fn reject(&self, request_id: RequestId, err: IngestError) -> DispatchOutcome {
        let kind = err.kind();
        warn!(
            kind = %kind,
            code = kind.code(),
            error = %err,
            "request rejected"
        );
        self.audit(&request_id, format!("{} ({})", err.client_message(), err));
        DispatchOutcome {
            request_id,
            status: ResponseStatus::BadRequest,
            body: err.client_message().to_string(),
            kind: OutcomeKind::Rejected { kind },
        }
    }

    fn probe(&self, request_id: RequestId) -> DispatchOutcome {
        debug!("probe request");
        self.audit(&request_id, "Validated");
        DispatchOutcome {
            request_id,
            status: ResponseStatus::Ok,
            body: self.validator_token.clone(),
            kind: OutcomeKind::Probe,
        }
    }

    fn ingest(&self, request_id: &RequestId, body: &[u8]) -> Result<OutcomeKind, IngestError> {
        let envelope = self.validator.validate(body)?;
        self.audit(
            request_id,
            format!(
                "Received envelope version={} type={} apMac={} observations={}",
                envelope.version,
                envelope.event,
                envelope.ap_mac,
                envelope.observations.len()
            ),
        );

        if let EventKind::Other(event_type) = envelope.event {
            info!(event_type = %event_type, "ignoring event type");
            self.audit(request_id, format!("Ignored event type {:?}", event_type));
            return Ok(OutcomeKind::Ignored { event_type });
        }

        if self.schema.ensure_schema()? == SchemaStatus::Created {
            self.audit(request_id, format!("Created table {}", TABLE_NAME));
        }

        for observation in &envelope.observations {
            let receipt = self
                .writer
                .write_observation(&envelope.ap_mac, observation)?;
            self.audit(request_id, format!("SQL: {}", receipt.statement));
        }

        let rows = envelope.observations.len();
        info!(ap_mac = %envelope.ap_mac, rows, "observations stored");
        Ok(OutcomeKind::Ingested { rows })
    }

    fn audit(&self, request_id: &RequestId, message: impl Into<String>) {
        if let Err(e) = self.audit.record(&AuditEntry::new(request_id, message)) {
            warn!(error = %e, "failed to write audit entry");
        }
    }
}
