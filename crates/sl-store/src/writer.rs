//! Single-row observation writer.
//!
//! Each call opens its own connection, applies the write policy (bounded
//! busy-wait, WAL), runs one prepared INSERT with bound values, and drops
//! the connection whatever the outcome.

use crate::connection::{open_for_write, StoreConfig};
use crate::error::{Result, StoreError};
use chrono::Utc;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use sl_common::Observation;
use std::fmt;
use tracing::{debug, warn};

const INSERT_SQL: &str = "INSERT INTO data (timestamp, apMac, clientMac, ipv4, ipv6, \
     seenTime, seenEpoch, ssid, rssi, manufacturer, os, location_lat, location_lng, location_unc) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)";

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

impl From<Option<&String>> for SqlValue {
    fn from(value: Option<&String>) -> Self {
        match value {
            Some(s) => SqlValue::Text(s.clone()),
            None => SqlValue::Null,
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(s) => write!(f, "{:?}", s),
            SqlValue::Null => write!(f, "NULL"),
        }
    }
}

/// The exact statement and parameters for one observation row.
///
/// Exposed so callers can record every insert attempt in their audit trail.
/// The rendered form contains client data and must be treated as sensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    params: Vec<SqlValue>,
}

impl InsertStatement {
    /// Bind an observation. `timestamp` is the server time of the write,
    /// independent of the source-supplied `seenTime`/`seenEpoch`.
    pub fn new(timestamp: i64, ap_mac: &str, obs: &Observation) -> Self {
        let params = vec![
            SqlValue::Integer(timestamp),
            SqlValue::Text(ap_mac.to_string()),
            SqlValue::Text(obs.client_mac.clone()),
            SqlValue::from(obs.ipv4.as_ref()),
            SqlValue::from(obs.ipv6.as_ref()),
            SqlValue::Text(obs.seen_time.clone()),
            SqlValue::Integer(obs.seen_epoch),
            SqlValue::Text(obs.ssid.clone()),
            SqlValue::Text(obs.rssi.clone()),
            SqlValue::Text(obs.manufacturer.clone()),
            SqlValue::Text(obs.os.clone()),
            SqlValue::Real(obs.location.lat),
            SqlValue::Real(obs.location.lng),
            SqlValue::Real(obs.location.unc),
        ];
        Self { params }
    }

    pub fn sql(&self) -> &'static str {
        INSERT_SQL
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Server timestamp bound to this row.
    pub fn timestamp(&self) -> i64 {
        match self.params.first() {
            Some(SqlValue::Integer(ts)) => *ts,
            _ => 0,
        }
    }

    fn execute(&self, conn: &Connection) -> rusqlite::Result<i64> {
        let mut stmt = conn.prepare(INSERT_SQL)?;
        stmt.execute(params_from_iter(self.params.iter()))?;
        Ok(conn.last_insert_rowid())
    }
}

impl fmt::Display for InsertStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} params: [", INSERT_SQL)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, "]")
    }
}

/// Outcome of a successful insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertReceipt {
    pub row_id: i64,
    pub statement: InsertStatement,
}

/// Writes one observation row per call.
#[derive(Debug, Clone)]
pub struct RecordWriter {
    config: StoreConfig,
}

impl RecordWriter {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Insert one observation for the given access point.
    ///
    /// The store must already exist; this never creates it.
    pub fn write_observation(&self, ap_mac: &str, obs: &Observation) -> Result<InsertReceipt> {
        let conn = open_for_write(&self.config)?;
        let statement = InsertStatement::new(Utc::now().timestamp(), ap_mac, obs);

        match statement.execute(&conn) {
            Ok(row_id) => {
                debug!(
                    row_id,
                    ap_mac,
                    client_mac = %obs.client_mac,
                    "observation stored"
                );
                Ok(InsertReceipt { row_id, statement })
            }
            Err(e) => {
                warn!(
                    path = %self.config.path.display(),
                    error = %e,
                    "observation insert failed"
                );
                Err(StoreError::InsertFailed {
                    statement: statement.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
