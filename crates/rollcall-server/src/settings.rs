//! Server configuration: an optional TOML file layered under `ROLLCALL_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use rollcall_core::session::SessionConfig;
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  /// SQLite database holding the ledger and the persisted session.
  pub store_path:        PathBuf,
  pub login_delay_ms:    u64,
  /// Append the demo records when the ledger is empty.
  pub seed_demo_records: bool,
}

impl ServerConfig {
  /// Read `path` (if it exists) and the environment on top of the defaults.
  pub fn load(path: &Path) -> anyhow::Result<Self> { Self::load_with_env(path, None) }

  /// Like [`Self::load`], but reads `ROLLCALL_*` variables from `env` instead
  /// of the process environment when given.
  fn load_with_env(
    path: &Path,
    env: Option<config::Map<String, String>>,
  ) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8787)?
      .set_default("store_path", "~/.local/share/rollcall/rollcall.db")?
      .set_default("login_delay_ms", 1000)?
      .set_default("seed_demo_records", true)?
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ROLLCALL")
          .try_parsing(true)
          .source(env),
      )
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn session_config(&self) -> SessionConfig {
    SessionConfig { login_delay: Duration::from_millis(self.login_delay_ms) }
  }
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
