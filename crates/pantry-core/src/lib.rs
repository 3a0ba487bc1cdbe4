//! Core types, the backend contract and the data-access gateway for Pantry.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! hosted backend (or a local stand-in) is reached only through the
//! [`Backend`] trait, which callers hand to [`Pantry::new`].

pub mod analytics;
pub mod auth;
pub mod backend;
pub mod error;
pub mod filter;
pub mod listing;
pub mod profile;
pub mod query;
pub mod records;
pub mod session;

pub use backend::Backend;
pub use error::{Error, Result};
pub use filter::{FilterValue, ListingFilter};
pub use session::SignUpOutcome;

// ─── Gateway ──────────────────────────────────────────────────────────────────

/// The data-access gateway: session operations plus record access, all
/// delegated to a single injected [`Backend`].
///
/// Holds no state of its own between calls; any session state lives in the
/// backend.
#[derive(Debug, Clone)]
pub struct Pantry<B> {
  backend: B,
}

impl<B: Backend> Pantry<B> {
  pub fn new(backend: B) -> Self { Self { backend } }

  /// Borrow the underlying backend.
  pub fn backend(&self) -> &B { &self.backend }
}
