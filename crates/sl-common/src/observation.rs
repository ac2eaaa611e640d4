//! Client-sighting observation records.
//!
//! These types match the `data.observations[]` entries of a `DevicesSeen`
//! envelope. Decoding is deliberately lenient: absent fields fall back to
//! their empty/zero representation, numbers supplied for text columns are
//! kept as text, and numeric strings are accepted for numeric columns. Only
//! structurally wrong values (objects or arrays where a scalar belongs, or
//! non-numeric text for a number) are rejected.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One client sighting reported by an access point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub client_mac: String,

    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub ipv4: Option<String>,

    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub ipv6: Option<String>,

    /// Source-supplied sighting time, stored verbatim.
    #[serde(default, deserialize_with = "lenient_string")]
    pub seen_time: String,

    /// Source-supplied sighting epoch, stored verbatim.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub seen_epoch: i64,

    #[serde(default, deserialize_with = "lenient_string")]
    pub ssid: String,

    /// Signal strength. Sources send either a number or a string; the store
    /// keeps the text form.
    #[serde(default, deserialize_with = "lenient_string")]
    pub rssi: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub manufacturer: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub os: String,

    #[serde(default, deserialize_with = "lenient_location")]
    pub location: Location,
}

/// Estimated position of the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: f64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: f64,

    /// Uncertainty radius.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub unc: f64,
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text field decoder: absent or `null` is `""`, numbers and booleans keep
/// their text form, objects and arrays are rejected.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_text(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a scalar, got {value}"))),
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| de::Error::custom(format!("integer out of range: {n}"))),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f.trunc() as i64))
                .map_err(|_| de::Error::custom(format!("expected an integer, got {s:?}")))
        }
        Some(other) => Err(de::Error::custom(format!(
            "expected an integer, got {other}"
        ))),
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom(format!("number out of range: {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("expected a number, got {s:?}"))),
        Some(other) => Err(de::Error::custom(format!("expected a number, got {other}"))),
    }
}

fn lenient_location<'de, D>(deserializer: D) -> Result<Location, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Location>::deserialize(deserializer)?.unwrap_or_default())
}
