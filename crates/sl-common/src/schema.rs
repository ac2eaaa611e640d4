//! Protocol versioning for inbound envelopes.

/// The single envelope version the ingestion endpoint accepts.
///
/// There is no negotiation: anything else is rejected.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Event type whose observations are persisted. Other event types are
/// accepted and ignored.
pub const DEVICES_SEEN_EVENT: &str = "DevicesSeen";

/// Check if an envelope version is accepted.
pub fn is_supported_version(version: &str) -> bool {
    version == PROTOCOL_VERSION
}
