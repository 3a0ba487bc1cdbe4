//! Error types for `pantry-core`.

use thiserror::Error;

use crate::query::Collection;

/// Boxed error returned by a [`crate::Backend`], passed through unchanged.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// The external call failed. The backend's own error is preserved and can
  /// be recovered with [`Error::backend_error`].
  #[error("backend call failed: {0}")]
  Backend(#[source] BackendError),

  /// A row could not be converted to or from its typed record.
  #[error("malformed {collection} record: {source}")]
  Codec {
    collection: Collection,
    #[source]
    source:     serde_json::Error,
  },

  /// A write or single-row read came back without a row.
  #[error("no {0} row returned")]
  MissingRow(Collection),
}

impl Error {
  pub(crate) fn backend<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend(Box::new(err))
  }

  /// Downcast the backend's error, if this is a backend failure of type `E`.
  pub fn backend_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
    match self {
      Self::Backend(e) => e.downcast_ref::<E>(),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
