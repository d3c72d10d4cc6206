//! Handlers for `/session` and `/roster`.
//!
//! | Method   | Path       | Notes |
//! |----------|------------|-------|
//! | `GET`    | `/session` | Current [`SessionView`] |
//! | `POST`   | `/session` | Body: `{"id","password","role"}`; 401 on refusal |
//! | `DELETE` | `/session` | Always 204 |
//! | `GET`    | `/roster`  | Demo identities for the sign-in screen |

use axum::{Json, extract::State, http::StatusCode};
use rollcall_core::{
  identity::{Credentials, Identity, Role},
  ledger::AttendanceLedger,
  session::{SessionState, SessionStorage},
};
use serde::Serialize;

use crate::{AppState, error::ApiError};

/// What the presentation layer reads from the session store.
#[derive(Debug, Serialize)]
pub struct SessionView {
  pub identity:         Option<Identity>,
  pub is_authenticated: bool,
  pub is_loading:       bool,
}

impl From<SessionState> for SessionView {
  fn from(state: SessionState) -> Self {
    Self {
      is_authenticated: state.is_authenticated(),
      is_loading:       state.is_loading,
      identity:         state.identity,
    }
  }
}

/// `GET /session`
pub async fn show<K, L>(State(state): State<AppState<K, L>>) -> Json<SessionView>
where
  K: SessionStorage,
  L: AttendanceLedger,
{
  Json(state.sessions.state().into())
}

/// `POST /session`: returns the signed-in [`Identity`].
pub async fn login<K, L>(
  State(state): State<AppState<K, L>>,
  Json(credentials): Json<Credentials>,
) -> Result<Json<Identity>, ApiError>
where
  K: SessionStorage,
  L: AttendanceLedger,
{
  let identity = state.sessions.login(credentials).await?;
  Ok(Json(identity))
}

/// `DELETE /session`
pub async fn logout<K, L>(State(state): State<AppState<K, L>>) -> StatusCode
where
  K: SessionStorage,
  L: AttendanceLedger,
{
  state.sessions.logout().await;
  StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize)]
pub struct RosterEntry {
  pub id:   String,
  pub name: String,
  pub role: Role,
}

/// `GET /roster`
pub async fn roster<K, L>(State(state): State<AppState<K, L>>) -> Json<Vec<RosterEntry>>
where
  K: SessionStorage,
  L: AttendanceLedger,
{
  let entries = state
    .sessions
    .roster()
    .iter()
    .map(|i| RosterEntry { id: i.id.clone(), name: i.name.clone(), role: i.role })
    .collect();
  Json(entries)
}
