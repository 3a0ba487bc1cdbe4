//! Connection settings for a Supabase project.

use serde::Deserialize;

/// Project URL and public (anon) API key, plus transport settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
  /// e.g. `https://xyzcompany.supabase.co`
  pub url:          String,
  pub anon_key:     String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 30 }

impl SupabaseConfig {
  pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
    Self {
      url:          url.into(),
      anon_key:     anon_key.into(),
      timeout_secs: default_timeout_secs(),
    }
  }
}
