//! `pantry`: command-line access to the Pantry data layer.
//!
//! # Usage
//!
//! ```text
//! pantry listings --filter category=bakery --exact vegan=false
//! pantry --email ada@example.com --password secret whoami
//! PANTRY_BACKEND=sqlite pantry --email ada@example.com --password secret \
//!   sign-up --full-name "Ada Lovelace" --username ada --account-type donor
//! ```
//!
//! Sessions do not outlive the process, so commands that need one take
//! `--email`/`--password` and sign in first.

mod command;
mod settings;

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::Parser;
use command::{Command, run};
use pantry_core::{Pantry, auth::Credentials};
use pantry_store_sqlite::SqliteStore;
use pantry_supabase::SupabaseClient;
use settings::{BackendKind, Settings};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pantry", version, about = "Food-sharing data access from the command line")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "pantry.toml")]
  config: PathBuf,

  /// Account email; signs in before the command runs.
  #[arg(long, env = "PANTRY_EMAIL")]
  email: Option<String>,

  /// Account password (plaintext).
  #[arg(long, env = "PANTRY_PASSWORD", hide_env_values = true)]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr; stdout carries the JSON result.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config).context("failed to read configuration")?;

  let credentials = match (cli.email, cli.password) {
    (Some(email), Some(password)) => Some(Credentials::new(email, password)),
    (None, None) => None,
    _ => bail!("--email and --password must be given together"),
  };

  tracing::debug!(backend = ?settings.backend, "selected backend");
  match settings.backend {
    BackendKind::Supabase => {
      let client =
        SupabaseClient::new(settings.supabase()?).context("failed to build supabase client")?;
      run(&Pantry::new(client), cli.command, credentials).await
    }
    BackendKind::Sqlite => {
      let store_path = settings.store_path();
      if let Some(parent) = store_path.parent()
        && !parent.as_os_str().is_empty()
      {
        std::fs::create_dir_all(parent)
          .with_context(|| format!("failed to create {}", parent.display()))?;
      }
      let store = SqliteStore::open(&store_path)
        .await
        .with_context(|| format!("failed to open store at {store_path:?}"))?
        .require_confirmation(settings.require_confirmation);
      run(&Pantry::new(store), cli.command, credentials).await
    }
  }
}
