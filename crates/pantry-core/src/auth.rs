//! Account and session records owned by the external auth subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Email/password pair used for both account creation and sign-in.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

impl Credentials {
  pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
    Self {
      email:    email.into(),
      password: password.into(),
    }
  }
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("email", &self.email)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// An account identity as reported by the auth subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:           Uuid,
  #[serde(default)]
  pub email:        Option<String>,
  #[serde(default)]
  pub created_at:   Option<DateTime<Utc>>,
  /// Unset while an email confirmation is still pending.
  #[serde(default)]
  pub confirmed_at: Option<DateTime<Utc>>,
}

/// Bearer credentials for an authenticated session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub access_token:  String,
  #[serde(default = "default_token_type")]
  pub token_type:    String,
  /// Lifetime of `access_token` in seconds, when the backend reports one.
  #[serde(default)]
  pub expires_in:    Option<i64>,
  #[serde(default)]
  pub refresh_token: Option<String>,
}

fn default_token_type() -> String { "bearer".to_owned() }

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("token_type", &self.token_type)
      .field("expires_in", &self.expires_in)
      .finish_non_exhaustive()
  }
}

/// Result of account creation.
///
/// `user` may legitimately be `None`: some backend configurations (email
/// confirmation pending) create the account without reporting its identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpResponse {
  pub user:    Option<User>,
  pub session: Option<Session>,
}

/// Result of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
  pub user:    User,
  pub session: Session,
}
