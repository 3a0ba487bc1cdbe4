//! SQLite backend for Pantry.
//!
//! A self-hosted stand-in for the hosted backend: accounts, sessions and
//! record collections live in one SQLite file. Records are stored as JSON
//! documents so any collection shape can be queried the same way.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod schema;
mod sql;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
