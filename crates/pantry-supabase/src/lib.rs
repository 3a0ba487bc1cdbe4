//! Supabase backend for Pantry.
//!
//! Talks to a hosted Supabase project over its REST surface: GoTrue
//! (`/auth/v1`) for accounts and sessions, PostgREST (`/rest/v1`) for the
//! record collections.

mod client;
mod params;

pub mod config;
pub mod error;

pub use client::SupabaseClient;
pub use config::SupabaseConfig;
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
