//! Error type for `pantry-supabase`.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// A non-success response from GoTrue or PostgREST.
  #[error("{status}: {message}")]
  Api {
    status:  u16,
    /// Service error code, e.g. `PGRST116` or `invalid_credentials`.
    code:    Option<String>,
    message: String,
  },

  #[error("unexpected response body: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("invalid configuration: {0}")]
  Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Union of the error bodies GoTrue and PostgREST send.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
  message:           Option<String>,
  msg:               Option<String>,
  error_description: Option<String>,
  error:             Option<String>,
  error_code:        Option<String>,
  /// A string in PostgREST bodies, a number (the HTTP status) in GoTrue ones.
  code:              Option<Value>,
}

impl Error {
  /// Build an [`Error::Api`] from a failed response's status and body.
  pub(crate) fn from_response(status: u16, body: &str) -> Self {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
      .message
      .or(parsed.msg)
      .or(parsed.error_description)
      .or(parsed.error)
      .unwrap_or_else(|| body.trim().to_owned());
    let code = parsed.error_code.or(match parsed.code {
      Some(Value::String(s)) => Some(s),
      _ => None,
    });
    Self::Api {
      status,
      code,
      message,
    }
  }

  /// The service error code, if this is an API error that carried one.
  pub fn code(&self) -> Option<&str> {
    match self {
      Self::Api { code, .. } => code.as_deref(),
      _ => None,
    }
  }
}
