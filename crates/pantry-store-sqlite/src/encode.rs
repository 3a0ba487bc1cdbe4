//! Encoding helpers between domain values and what SQLite stores.
//!
//! Timestamps are RFC 3339 strings with microsecond precision in UTC so they
//! sort lexically. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use pantry_core::{auth::User, query::Row};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON documents ───────────────────────────────────────────────────────────

/// `json_extract` path for a top-level key.
///
/// Keys are quoted so names with dots or spaces address a single key; a key
/// containing a double quote cannot be expressed and is rejected.
pub fn json_path(column: &str) -> Result<String> {
  if column.is_empty() || column.contains('"') {
    return Err(Error::InvalidColumn(column.to_owned()));
  }
  Ok(format!("$.\"{column}\""))
}

/// The SQL value `json_extract` yields for `value`, so the two compare equal.
///
/// Booleans come back from `json_extract` as integers and nested values as
/// minified JSON text.
pub fn sql_value(value: &Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
    },
    Value::String(s) => SqlValue::Text(s.clone()),
    Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
  }
}

pub fn decode_row(body: &str) -> serde_json::Result<Row> { serde_json::from_str(body) }

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// An `accounts` row as read from SQLite, before parsing.
pub struct RawAccount {
  pub id:           String,
  pub email:        String,
  pub created_at:   String,
  pub confirmed_at: Option<String>,
}

impl RawAccount {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:           decode_uuid(&self.id)?,
      email:        Some(self.email),
      created_at:   Some(decode_dt(&self.created_at)?),
      confirmed_at: self.confirmed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
