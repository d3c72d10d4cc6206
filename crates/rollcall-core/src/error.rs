//! Error types for `rollcall-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("record is missing a required field: {0}")]
  MissingField(&'static str),

  #[error("unknown persisted session version: {0}")]
  UnknownSessionVersion(u32),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Why a login attempt was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  #[error("{0} must not be empty")]
  MissingField(&'static str),

  /// Unknown `(id, role)` pair or wrong password. The two are not told apart.
  #[error("invalid credentials")]
  InvalidCredentials,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
