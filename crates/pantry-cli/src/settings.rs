//! Layered settings: an optional TOML file, then `PANTRY_*` environment
//! variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use pantry_supabase::SupabaseConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
  #[default]
  Supabase,
  Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default)]
  pub backend:              BackendKind,
  #[serde(default)]
  pub supabase_url:         Option<String>,
  #[serde(default)]
  pub supabase_anon_key:    Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:         u64,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  /// SQLite only: new accounts must be confirmed before signing in.
  #[serde(default)]
  pub require_confirmation: bool,
}

fn default_timeout_secs() -> u64 { 30 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/pantry/pantry.db") }

impl Settings {
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("PANTRY").try_parsing(true))
      .build()?
      .try_deserialize()
  }

  /// Supabase connection settings; both the URL and the anon key must be set.
  pub fn supabase(&self) -> anyhow::Result<SupabaseConfig> {
    let url = non_empty(&self.supabase_url)
      .context("supabase_url is not set (PANTRY_SUPABASE_URL)")?;
    let anon_key = non_empty(&self.supabase_anon_key)
      .context("supabase_anon_key is not set (PANTRY_SUPABASE_ANON_KEY)")?;
    Ok(SupabaseConfig {
      url:          url.to_owned(),
      anon_key:     anon_key.to_owned(),
      timeout_secs: self.timeout_secs,
    })
  }

  /// `store_path` with a leading `~` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
