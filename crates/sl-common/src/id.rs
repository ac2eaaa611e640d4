//! Request identity types.
//!
//! Every inbound HTTP request is tagged with a [`RequestId`] so the audit log
//! and the tracing output for one request can be correlated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Request ID for correlating audit entries of a single request.
///
/// Format: `req-<date>-<time>-<random>`
/// Example: `req-20261018-143022-ab12cd`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let random: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(6)
            .collect();
        RequestId(format!("req-{}-{}", now.format("%Y%m%d-%H%M%S"), random))
    }

    /// Parse an existing request ID string.
    pub fn parse(s: &str) -> Option<Self> {
        if s.starts_with("req-") && s.len() == 26 {
            Some(RequestId(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
