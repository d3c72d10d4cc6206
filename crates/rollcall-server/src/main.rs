//! rollcall server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, restores the persisted session and serves the JSON API over
//! HTTP.
//!
//! ```
//! cargo run -p rollcall-server -- --config config.toml
//! cargo run -p rollcall-server -- --memory
//! ```

mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use rollcall_api::AppState;
use rollcall_core::{
  ledger::{AttendanceLedger, MemoryLedger, seed_if_empty},
  roster::Roster,
  session::{MemoryStorage, SessionStorage, SessionStore},
};
use rollcall_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Rollcall attendance ledger server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Keep the ledger and session in memory instead of SQLite.
  #[arg(long)]
  memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;

  if cli.memory {
    tracing::info!("using in-memory stores; nothing will survive a restart");
    return serve(&cfg, MemoryStorage::default(), MemoryLedger::new()).await;
  }

  if let Some(parent) = cfg.store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  serve(&cfg, store.clone(), store).await
}

async fn serve<K, L>(cfg: &ServerConfig, storage: K, ledger: L) -> anyhow::Result<()>
where
  K: SessionStorage + 'static,
  L: AttendanceLedger + 'static,
{
  if cfg.seed_demo_records && seed_if_empty(&ledger).await.context("failed to seed ledger")? {
    tracing::info!("seeded ledger with demo records");
  }

  let sessions = SessionStore::open(storage, Roster::builtin(), cfg.session_config()).await;
  let app = rollcall_api::api_router(AppState::new(sessions, ledger))
    .layer(TraceLayer::new_for_http());

  let address = cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "could not listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
