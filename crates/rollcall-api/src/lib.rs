//! JSON REST API for Rollcall.
//!
//! Exposes an axum [`Router`] over a [`SessionStore`] and any
//! [`AttendanceLedger`]. This is the surface a dashboard front end drives:
//! it reads the session and record snapshots and calls login, logout and
//! record creation. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rollcall_api::api_router(state))
//! ```

pub mod error;
pub mod records;
pub mod session;

use std::sync::Arc;

use axum::{Router, routing::get};
use rollcall_core::{
  ledger::AttendanceLedger,
  session::{SessionStorage, SessionStore},
};

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct AppState<K, L> {
  pub sessions: Arc<SessionStore<K>>,
  pub ledger:   Arc<L>,
}

impl<K, L> AppState<K, L> {
  pub fn new(sessions: SessionStore<K>, ledger: L) -> Self {
    Self { sessions: Arc::new(sessions), ledger: Arc::new(ledger) }
  }
}

impl<K, L> Clone for AppState<K, L> {
  fn clone(&self) -> Self {
    Self { sessions: self.sessions.clone(), ledger: self.ledger.clone() }
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<K, L>(state: AppState<K, L>) -> Router<()>
where
  K: SessionStorage + 'static,
  L: AttendanceLedger + 'static,
{
  Router::new()
    // Session
    .route(
      "/session",
      get(session::show::<K, L>)
        .post(session::login::<K, L>)
        .delete(session::logout::<K, L>),
    )
    .route("/roster", get(session::roster::<K, L>))
    // Records
    .route("/records", get(records::list::<K, L>).post(records::create::<K, L>))
    .route("/students/{id}/summary", get(records::student_summary::<K, L>))
    .route("/ledger/verify", get(records::verify::<K, L>))
    .with_state(state)
}
