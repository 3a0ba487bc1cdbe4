//! [`SqliteStore`], the SQLite implementation of [`Backend`].

use std::{
  path::Path,
  sync::{Arc, Mutex, PoisonError},
};

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use chrono::Utc;
use pantry_core::{
  Backend,
  auth::{AuthSession, Credentials, Session, SignUpResponse, User},
  query::{Collection, Columns, Predicate, Query, Row},
};
use rand_core::{OsRng, RngCore};
use rusqlite::OptionalExtension as _;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawAccount, decode_dt, decode_row, encode_dt, encode_uuid},
  schema::SCHEMA,
  sql,
};

/// Keys of a stored record that updates never touch.
const IMMUTABLE_KEYS: [&str; 2] = ["id", "created_at"];

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pantry backend held in a single SQLite file.
///
/// Cloning is cheap: the connection and the current session are
/// reference-counted and shared between clones.
#[derive(Clone)]
pub struct SqliteStore {
  conn:                 tokio_rusqlite::Connection,
  /// Token of the current session, if signed in.
  current:              Arc<Mutex<Option<String>>>,
  require_confirmation: bool,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      current: Arc::new(Mutex::new(None)),
      require_confirmation: false,
    })
  }

  /// When set, new accounts start unconfirmed: sign-up reports no user and
  /// sign-in is refused until [`confirm_email`](Self::confirm_email).
  pub fn require_confirmation(mut self, required: bool) -> Self {
    self.require_confirmation = required;
    self
  }

  /// Mark the account for `email` as confirmed.
  pub async fn confirm_email(&self, email: &str) -> Result<()> {
    let email_owned = email.trim().to_owned();
    let now = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accounts SET confirmed_at = ?1 \
           WHERE email = ?2 AND confirmed_at IS NULL",
          rusqlite::params![now, email_owned],
        )?)
      })
      .await?;
    if changed == 0 && self.find_account(email).await?.is_none() {
      return Err(Error::AccountNotFound(email.to_owned()));
    }
    Ok(())
  }

  fn current_token(&self) -> Option<String> {
    self
      .current
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  fn set_current_token(&self, token: Option<String>) -> Option<String> {
    let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *current, token)
  }

  /// Look up an account and its password hash by email.
  async fn find_account(&self, email: &str) -> Result<Option<(RawAccount, String)>> {
    let email = email.trim().to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, email, created_at, confirmed_at, password_hash \
                 FROM accounts WHERE email = ?1",
                rusqlite::params![email],
                |row| {
                  Ok((
                    RawAccount {
                      id:           row.get(0)?,
                      email:        row.get(1)?,
                      created_at:   row.get(2)?,
                      confirmed_at: row.get(3)?,
                    },
                    row.get(4)?,
                  ))
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  /// Store a fresh random session for `account_id` and make it current.
  async fn issue_session(&self, account_id: Uuid) -> Result<Session> {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);

    let token_owned = token.clone();
    let account_str = encode_uuid(account_id);
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token, account_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![token_owned, account_str, now],
        )?;
        Ok(())
      })
      .await?;

    self.set_current_token(Some(token.clone()));
    debug!(%account_id, "session issued");
    Ok(Session {
      access_token:  token,
      token_type:    "bearer".to_owned(),
      expires_in:    None,
      refresh_token: None,
    })
  }
}

// ─── Record helpers ──────────────────────────────────────────────────────────

/// Give a row to be inserted its `id` and `created_at` if the caller did not.
///
/// A supplied `created_at` is rewritten in the canonical encoding so ordering
/// by its text matches ordering by time.
fn prepare_insert(mut row: Row) -> Result<(String, Row)> {
  let id = row
    .entry("id")
    .or_insert_with(|| Value::String(encode_uuid(Uuid::new_v4())));
  let id = match id {
    Value::String(s) => s.clone(),
    other => return Err(Error::InvalidId(other.clone())),
  };
  let created_at = match row.get("created_at") {
    None => encode_dt(Utc::now()),
    Some(Value::String(s)) => encode_dt(decode_dt(s)?),
    Some(other) => return Err(Error::DateParse(format!("created_at is not a string: {other}"))),
  };
  row.insert("created_at".to_owned(), Value::String(created_at));
  Ok((id, row))
}

/// Keep only the selected columns (plus embedded parents). Selected columns
/// missing from the document come back as `null`.
fn project(mut row: Row, query: &Query) -> Row {
  let Columns::Only(columns) = &query.columns else {
    return row;
  };
  let mut projected = Row::new();
  for column in columns {
    let value = row.remove(column).unwrap_or(Value::Null);
    projected.insert(column.clone(), value);
  }
  for embed in &query.embeds {
    let name = embed.collection.name();
    if let Some(parent) = row.remove(name) {
      projected.insert(name.to_owned(), parent);
    }
  }
  projected
}

fn to_rusqlite<E: std::error::Error + Send + Sync + 'static>(err: E) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err))
}

// ─── Backend impl ────────────────────────────────────────────────────────────

impl Backend for SqliteStore {
  type Error = Error;

  // ── Auth ──────────────────────────────────────────────────────────────────

  async fn create_account(&self, credentials: &Credentials) -> Result<SignUpResponse> {
    let email = credentials.email.trim().to_owned();
    if self.find_account(&email).await?.is_some() {
      return Err(Error::EmailTaken(email));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(credentials.password.as_bytes(), &salt)
      .map_err(|e| Error::PasswordHash(e.to_string()))?
      .to_string();

    let now = Utc::now();
    let user = User {
      id:           Uuid::new_v4(),
      email:        Some(email.clone()),
      created_at:   Some(now),
      confirmed_at: (!self.require_confirmation).then_some(now),
    };

    let id_str = encode_uuid(user.id);
    let created_str = encode_dt(now);
    let confirmed_str = user.confirmed_at.map(encode_dt);
    let email_owned = email.clone();
    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO accounts (id, email, password_hash, created_at, confirmed_at) \
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, email_owned, hash, created_str, confirmed_str],
        );
        match result {
          Ok(_) => Ok(true),
          // Another sign-up took the email after the lookup above.
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;
    if !inserted {
      return Err(Error::EmailTaken(email));
    }

    if self.require_confirmation {
      debug!(user_id = %user.id, "account created; confirmation pending");
      return Ok(SignUpResponse::default());
    }

    let session = self.issue_session(user.id).await?;
    Ok(SignUpResponse {
      user:    Some(user),
      session: Some(session),
    })
  }

  async fn authenticate(&self, credentials: &Credentials) -> Result<AuthSession> {
    let (raw, hash) = self
      .find_account(&credentials.email)
      .await?
      .ok_or(Error::InvalidCredentials)?;

    let parsed = PasswordHash::new(&hash).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Argon2::default()
      .verify_password(credentials.password.as_bytes(), &parsed)
      .map_err(|_| Error::InvalidCredentials)?;

    let user = raw.into_user()?;
    if user.confirmed_at.is_none() {
      return Err(Error::EmailNotConfirmed);
    }
    let session = self.issue_session(user.id).await?;
    Ok(AuthSession { user, session })
  }

  async fn invalidate_session(&self) -> Result<()> {
    let Some(token) = self.set_current_token(None) else {
      return Ok(());
    };
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE token = ?1", rusqlite::params![token])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session_user(&self) -> Result<Option<User>> {
    let Some(token) = self.current_token() else {
      return Ok(None);
    };
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT a.id, a.email, a.created_at, a.confirmed_at \
               FROM sessions s JOIN accounts a ON a.id = s.account_id \
               WHERE s.token = ?1",
              rusqlite::params![token],
              |row| {
                Ok(RawAccount {
                  id:           row.get(0)?,
                  email:        row.get(1)?,
                  created_at:   row.get(2)?,
                  confirmed_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawAccount::into_user).transpose()
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn fetch(&self, query: &Query) -> Result<Vec<Row>> {
    let stmt = sql::fetch(query)?;
    let embeds: Vec<(String, String)> = query
      .embeds
      .iter()
      .map(|e| (e.collection.name().to_owned(), e.foreign_key.clone()))
      .collect();

    let rows: Vec<Row> = self
      .conn
      .call(move |conn| {
        let mut select = conn.prepare(&stmt.sql)?;
        let bodies = select
          .query_map(rusqlite::params_from_iter(stmt.params.iter()), |row| {
            row.get::<_, String>(1)
          })?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        let mut parent = conn.prepare(
          "SELECT body FROM records WHERE collection = ?1 AND id = ?2",
        )?;
        let mut rows = Vec::with_capacity(bodies.len());
        for body in bodies {
          let mut row = decode_row(&body).map_err(to_rusqlite)?;
          for (name, foreign_key) in &embeds {
            let embedded = match row.get(foreign_key).and_then(Value::as_str) {
              Some(key) => parent
                .query_row(rusqlite::params![name, key], |r| r.get::<_, String>(0))
                .optional()?
                .map(|body| decode_row(&body).map(Value::Object))
                .transpose()
                .map_err(to_rusqlite)?
                .unwrap_or(Value::Null),
              None => Value::Null,
            };
            row.insert(name.clone(), embedded);
          }
          rows.push(row);
        }
        Ok(rows)
      })
      .await?;

    if query.single && rows.len() != 1 {
      return Err(Error::Cardinality {
        expected: 1,
        found:    rows.len(),
      });
    }
    debug!(collection = %query.collection, rows = rows.len(), "fetched");
    Ok(rows.into_iter().map(|row| project(row, query)).collect())
  }

  async fn insert(&self, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>> {
    let prepared = rows
      .into_iter()
      .map(prepare_insert)
      .collect::<Result<Vec<_>>>()?;
    let encoded = prepared
      .iter()
      .map(|(id, row)| Ok((id.clone(), serde_json::to_string(row)?)))
      .collect::<Result<Vec<_>>>()?;

    let duplicate: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (id, body) in &encoded {
          let exists = tx
            .query_row(
              "SELECT 1 FROM records WHERE collection = ?1 AND id = ?2",
              rusqlite::params![collection.name(), id],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if exists {
            // Dropping `tx` rolls back the rows inserted so far.
            return Ok(Some(id.clone()));
          }
          tx.execute(
            "INSERT INTO records (collection, id, body) VALUES (?1, ?2, ?3)",
            rusqlite::params![collection.name(), id, body],
          )?;
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    if let Some(id) = duplicate {
      return Err(Error::Conflict { collection, id });
    }
    debug!(%collection, rows = prepared.len(), "inserted");
    Ok(prepared.into_iter().map(|(_, row)| row).collect())
  }

  async fn update(
    &self,
    collection: Collection,
    mut patch: Row,
    filter: &[Predicate],
  ) -> Result<Vec<Row>> {
    for key in IMMUTABLE_KEYS {
      patch.remove(key);
    }
    let stmt = sql::select(collection, filter)?;

    let updated: Vec<Row> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let matched = {
          let mut select = tx.prepare(&stmt.sql)?;
          select
            .query_map(rusqlite::params_from_iter(stmt.params.iter()), |row| {
              Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<(String, String)>>>()?
        };

        let mut updated = Vec::with_capacity(matched.len());
        for (id, body) in matched {
          let mut row = decode_row(&body).map_err(to_rusqlite)?;
          row.extend(patch.clone());
          let body = serde_json::to_string(&row).map_err(to_rusqlite)?;
          tx.execute(
            "UPDATE records SET body = ?1 WHERE collection = ?2 AND id = ?3",
            rusqlite::params![body, collection.name(), id],
          )?;
          updated.push(row);
        }
        tx.commit()?;
        Ok(updated)
      })
      .await?;

    debug!(%collection, rows = updated.len(), "updated");
    Ok(updated)
  }
}
