//! Envelope validation.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. size limit and JSON syntax
//! 2. protocol version
//! 3. shared secret (fail closed: absent is the same as wrong)
//! 4. event-type dispatch and observation decoding
//!
//! Only `DevicesSeen` envelopes carry observations onward. Any other event
//! type validates successfully with nothing to store.

use serde::Deserialize;
use serde_json::{Map, Value};
use sl_common::schema::is_supported_version;
use sl_common::{ErrorKind, Observation, DEVICES_SEEN_EVENT};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Why an envelope was rejected.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unsupported envelope version: {found}")]
    UnsupportedVersion { found: String },

    #[error("unauthorized: secret {reason}")]
    Unauthorized { reason: &'static str },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::MalformedPayload(_) => ErrorKind::MalformedPayload,
            ValidationError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            ValidationError::Unauthorized { .. } => ErrorKind::Unauthorized,
        }
    }

    /// Short message safe to return to the caller.
    pub fn client_message(&self) -> &'static str {
        match self {
            ValidationError::MalformedPayload(_) => "Got invalid JSON",
            ValidationError::UnsupportedVersion { .. } => "Got non-2.0 data; discarding",
            ValidationError::Unauthorized { .. } => "Got invalid secret; discarding",
        }
    }
}

/// Event discriminator of a validated envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    DevicesSeen,
    /// Accepted but not processed. Empty when `type` was absent.
    Other(String),
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::DevicesSeen => write!(f, "{}", DEVICES_SEEN_EVENT),
            EventKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// An envelope that passed version and secret checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEnvelope {
    pub version: String,
    pub event: EventKind,
    pub ap_mac: String,
    /// In payload order. Always empty for events other than `DevicesSeen`.
    pub observations: Vec<Observation>,
}

#[derive(Deserialize)]
struct DevicesSeenData {
    #[serde(
        default,
        rename = "apMac",
        deserialize_with = "sl_common::observation::lenient_string"
    )]
    ap_mac: String,
    #[serde(default)]
    observations: Option<Vec<Observation>>,
}

/// Parses and authenticates inbound envelopes.
pub struct PayloadValidator {
    secret: Vec<u8>,
    max_body_bytes: usize,
}

impl PayloadValidator {
    pub fn new(secret: &str, max_body_bytes: usize) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            max_body_bytes,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Validate a raw request body.
    pub fn validate(&self, raw: &[u8]) -> Result<ValidatedEnvelope, ValidationError> {
        if raw.len() > self.max_body_bytes {
            return Err(ValidationError::MalformedPayload(format!(
                "body exceeds {} bytes",
                self.max_body_bytes
            )));
        }

        let mut root = match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(ValidationError::MalformedPayload(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
            Err(e) => return Err(ValidationError::MalformedPayload(e.to_string())),
        };

        let version = check_version(&root)?;
        self.check_secret(&root)?;

        let event = match root.get("type") {
            Some(Value::String(t)) if t == DEVICES_SEEN_EVENT => EventKind::DevicesSeen,
            Some(Value::String(t)) => EventKind::Other(t.clone()),
            Some(other) => EventKind::Other(other.to_string()),
            None => EventKind::Other(String::new()),
        };

        if event != EventKind::DevicesSeen {
            return Ok(ValidatedEnvelope {
                version,
                event,
                ap_mac: String::new(),
                observations: Vec::new(),
            });
        }

        let data = match root.remove("data") {
            Some(data @ Value::Object(_)) => data,
            Some(other) => {
                return Err(ValidationError::MalformedPayload(format!(
                    "data must be an object, got {}",
                    json_type_name(&other)
                )))
            }
            None => {
                return Err(ValidationError::MalformedPayload(
                    "DevicesSeen envelope has no data".to_string(),
                ))
            }
        };
        let data: DevicesSeenData = serde_json::from_value(data)
            .map_err(|e| ValidationError::MalformedPayload(format!("data: {}", e)))?;

        Ok(ValidatedEnvelope {
            version,
            event,
            ap_mac: data.ap_mac,
            observations: data.observations.unwrap_or_default(),
        })
    }

    fn check_secret(&self, root: &Map<String, Value>) -> Result<(), ValidationError> {
        let supplied = match root.get("secret") {
            Some(Value::String(s)) => s.as_bytes(),
            Some(_) => return Err(ValidationError::Unauthorized { reason: "not a string" }),
            None => return Err(ValidationError::Unauthorized { reason: "missing" }),
        };
        if bool::from(supplied.ct_eq(self.secret.as_slice())) {
            Ok(())
        } else {
            Err(ValidationError::Unauthorized { reason: "mismatch" })
        }
    }
}

fn check_version(root: &Map<String, Value>) -> Result<String, ValidationError> {
    match root.get("version") {
        Some(Value::String(v)) if is_supported_version(v) => Ok(v.clone()),
        Some(Value::String(v)) => Err(ValidationError::UnsupportedVersion { found: v.clone() }),
        Some(other) => Err(ValidationError::UnsupportedVersion {
            found: other.to_string(),
        }),
        None => Err(ValidationError::UnsupportedVersion {
            found: "<absent>".to_string(),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> PayloadValidator {
        PayloadValidator::new("S", 64 * 1024)
    }

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn envelope(secret: &str) -> Value {
        json!({
            "version": "2.0",
            "secret": secret,
            "type": "DevicesSeen",
            "data": {
                "apMac": "AA:BB",
                "observations": [
                    {"clientMac": "11:22", "seenEpoch": 100},
                    {"clientMac": "33:44", "seenEpoch": 101}
                ]
            }
        })
    }

    #[test]
    fn test_valid_devices_seen() {
        let env = validator().validate(&body(envelope("S"))).unwrap();
        assert_eq!(env.version, "2.0");
        assert_eq!(env.event, EventKind::DevicesSeen);
        assert_eq!(env.ap_mac, "AA:BB");
        assert_eq!(env.observations.len(), 2);
        assert_eq!(env.observations[0].client_mac, "11:22");
        assert_eq!(env.observations[1].client_mac, "33:44");
    }

    #[test]
    fn test_not_json() {
        let err = validator().validate(b"hello there").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
        assert_eq!(err.client_message(), "Got invalid JSON");
    }

    #[test]
    fn test_top_level_array_is_malformed() {
        let err = validator().validate(b"[1, 2]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }

    #[test]
    fn test_oversize_rejected_before_parsing() {
        let small = PayloadValidator::new("S", 16);
        let err = small.validate(&body(envelope("S"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
        assert!(err.to_string().contains("16 bytes"));
    }

    #[test]
    fn test_version_checked_before_secret() {
        let mut value = envelope("wrong");
        value["version"] = json!("1.0");
        let err = validator().validate(&body(value)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    }

    #[test]
    fn test_numeric_version_rejected() {
        let mut value = envelope("S");
        value["version"] = json!(2.0);
        let err = validator().validate(&body(value)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    }

    #[test]
    fn test_missing_version_rejected() {
        let mut value = envelope("S");
        value.as_object_mut().unwrap().remove("version");
        let err = validator().validate(&body(value)).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsupportedVersion { ref found } if found == "<absent>"
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let err = validator().validate(&body(envelope("wrong"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.client_message(), "Got invalid secret; discarding");
    }

    #[test]
    fn test_missing_secret_same_as_wrong() {
        let mut value = envelope("S");
        value.as_object_mut().unwrap().remove("secret");
        let err = validator().validate(&body(value)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.client_message(), "Got invalid secret; discarding");
    }

    #[test]
    fn test_secret_prefix_rejected() {
        let v = PayloadValidator::new("secret-value", 1024);
        let err = v.validate(&body(envelope("secret"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_other_event_type_ignored() {
        let mut value = envelope("S");
        value["type"] = json!("BluetoothDevicesSeen");
        let env = validator().validate(&body(value)).unwrap();
        assert_eq!(env.event, EventKind::Other("BluetoothDevicesSeen".to_string()));
        assert!(env.observations.is_empty());
    }

    #[test]
    fn test_absent_type_ignored() {
        let mut value = envelope("S");
        value.as_object_mut().unwrap().remove("type");
        let env = validator().validate(&body(value)).unwrap();
        assert_eq!(env.event, EventKind::Other(String::new()));
    }

    #[test]
    fn test_devices_seen_without_data_is_malformed() {
        let mut value = envelope("S");
        value.as_object_mut().unwrap().remove("data");
        let err = validator().validate(&body(value)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }

    #[test]
    fn test_missing_observations_is_empty() {
        let mut value = envelope("S");
        value["data"] = json!({"apMac": "AA:BB"});
        let env = validator().validate(&body(value)).unwrap();
        assert!(env.observations.is_empty());
        assert_eq!(env.ap_mac, "AA:BB");
    }

    #[test]
    fn test_numeric_ap_mac_kept_as_text() {
        let mut value = envelope("S");
        value["data"]["apMac"] = json!(42);
        let env = validator().validate(&body(value)).unwrap();
        assert_eq!(env.ap_mac, "42");
    }

    #[test]
    fn test_structured_ap_mac_is_malformed() {
        let mut value = envelope("S");
        value["data"]["apMac"] = json!(["AA:BB"]);
        let err = validator().validate(&body(value)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }

    #[test]
    fn test_bad_observation_is_malformed() {
        let mut value = envelope("S");
        value["data"]["observations"] = json!([{"clientMac": {"x": 1}}]);
        let err = validator().validate(&body(value)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }
}
