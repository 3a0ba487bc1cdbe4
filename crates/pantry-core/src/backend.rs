//! The `Backend` trait: the contract of the external backend service.
//!
//! The trait is implemented by `pantry-supabase` (the hosted service) and
//! `pantry-store-sqlite` (a local stand-in). [`crate::Pantry`] depends on this
//! abstraction only, so tests can substitute a fake.

use std::future::Future;

use crate::{
  auth::{AuthSession, Credentials, SignUpResponse, User},
  query::{Collection, Predicate, Query, Row},
};

/// Authentication and record primitives of the backend service.
///
/// Every method is a single external call. Implementations may keep the
/// current session between calls; nothing else is expected to persist
/// client-side.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Auth ──────────────────────────────────────────────────────────────

  /// Create an account. A response without a user is a success.
  fn create_account<'a>(
    &'a self,
    credentials: &'a Credentials,
  ) -> impl Future<Output = Result<SignUpResponse, Self::Error>> + Send + 'a;

  /// Exchange credentials for a session, which becomes the current one.
  fn authenticate<'a>(
    &'a self,
    credentials: &'a Credentials,
  ) -> impl Future<Output = Result<AuthSession, Self::Error>> + Send + 'a;

  /// Invalidate the current session, if any.
  fn invalidate_session(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The identity behind the current session; `None` when signed out.
  fn session_user(
    &self,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Records ───────────────────────────────────────────────────────────

  /// Run a read. When `query.single` is set, anything but exactly one row
  /// is an error.
  fn fetch<'a>(
    &'a self,
    query: &'a Query,
  ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send + 'a;

  /// Insert rows and return them as stored.
  fn insert(
    &self,
    collection: Collection,
    rows: Vec<Row>,
  ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send + '_;

  /// Merge `patch` into every row matching `filter` and return the updated
  /// rows.
  fn update<'a>(
    &'a self,
    collection: Collection,
    patch: Row,
    filter: &'a [Predicate],
  ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send + 'a;
}
