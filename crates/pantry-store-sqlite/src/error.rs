//! Error type for `pantry-store-sqlite`.

use pantry_core::query::Collection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("password hashing failed: {0}")]
  PasswordHash(String),

  // ── Auth ──────────────────────────────────────────────────────────────
  #[error("an account with email {0:?} already exists")]
  EmailTaken(String),

  #[error("invalid login credentials")]
  InvalidCredentials,

  #[error("email not confirmed")]
  EmailNotConfirmed,

  #[error("no account with email {0:?}")]
  AccountNotFound(String),

  // ── Records ───────────────────────────────────────────────────────────
  #[error("{collection} already has a record with id {id}")]
  Conflict { collection: Collection, id: String },

  #[error("expected {expected} row(s), found {found}")]
  Cardinality { expected: usize, found: usize },

  #[error("invalid column name {0:?}")]
  InvalidColumn(String),

  #[error("record id must be a string, got {0}")]
  InvalidId(serde_json::Value),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
