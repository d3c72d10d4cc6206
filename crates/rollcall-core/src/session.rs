//! The session store: the single signed-in identity and its persisted copy.
//!
//! At most one identity is current at a time. A successful login writes the
//! identity under [`SESSION_KEY`] in a [`SessionStorage`]; a later process
//! calls [`SessionStore::restore`] to pick it back up. Anything unreadable in
//! storage is treated as "logged out".
//!
//! State changes are published through a [`tokio::sync::watch`] channel so a
//! presentation layer can re-render from [`SessionState`] snapshots.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{
  AuthError, Error, Result,
  identity::{Credentials, Identity},
  roster::{DEMO_PASSWORD, Roster},
};

/// The storage key the current identity is persisted under.
pub const SESSION_KEY: &str = "attendanceUser";

const SESSION_VERSION: u32 = 1;

// ─── Storage ─────────────────────────────────────────────────────────────────

/// Durable key/value storage for the persisted session, the way a browser
/// profile's local storage would hold it.
pub trait SessionStorage: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the value under `key`; `None` if absent.
  fn load<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Write `value` under `key`, replacing any previous value.
  fn save<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove `key`. Removing an absent key is not an error.
  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Process-local storage. Clones share one map, like two tabs of the same
/// browser profile.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
  entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
  fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> T {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut entries)
  }
}

impl SessionStorage for MemoryStorage {
  type Error = Infallible;

  async fn load(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.with_entries(|e| e.get(key).cloned()))
  }

  async fn save(&self, key: &str, value: String) -> Result<(), Infallible> {
    self.with_entries(|e| e.insert(key.to_owned(), value));
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Infallible> {
    self.with_entries(|e| e.remove(key));
    Ok(())
  }
}

// ─── Persisted layout ────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct PersistedSession {
  version:  u32,
  identity: Identity,
}

/// Either the versioned envelope or a bare identity as written by earlier
/// releases.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSession {
  Versioned(PersistedSession),
  Legacy(Identity),
}

/// Serialise `identity` into the versioned persisted form.
pub fn encode_session(identity: &Identity) -> Result<String> {
  Ok(serde_json::to_string(&PersistedSession {
    version:  SESSION_VERSION,
    identity: identity.clone(),
  })?)
}

/// Parse a persisted session value.
pub fn decode_session(raw: &str) -> Result<Identity> {
  match serde_json::from_str(raw)? {
    StoredSession::Versioned(p) if p.version == SESSION_VERSION => Ok(p.identity),
    StoredSession::Versioned(p) => Err(Error::UnknownSessionVersion(p.version)),
    StoredSession::Legacy(identity) => Ok(identity),
  }
}

// ─── State ───────────────────────────────────────────────────────────────────

/// Tunables for [`SessionStore`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
  /// Artificial round-trip delay applied to every well-formed login attempt.
  pub login_delay: Duration,
}

impl Default for SessionConfig {
  fn default() -> Self { Self { login_delay: Duration::from_secs(1) } }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
  Unauthenticated,
  Authenticating,
  Authenticated,
}

/// A snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
  pub identity:   Option<Identity>,
  /// True while restoring from storage and during the login delay.
  pub is_loading: bool,
}

impl SessionState {
  pub fn is_authenticated(&self) -> bool { self.identity.is_some() }

  pub fn phase(&self) -> SessionPhase {
    if self.is_loading {
      SessionPhase::Authenticating
    } else if self.identity.is_some() {
      SessionPhase::Authenticated
    } else {
      SessionPhase::Unauthenticated
    }
  }
}

/// Marks one operation as in flight for as long as it lives.
///
/// The loading flag is raised on entry and cleared only when the last
/// in-flight operation ends, including when its future is dropped mid-way.
/// The counter is only touched inside the channel's modify closures, so it
/// stays consistent with the published flag.
struct LoadingGuard<'a> {
  state:    &'a watch::Sender<SessionState>,
  inflight: &'a AtomicUsize,
}

impl<'a> LoadingGuard<'a> {
  fn enter(state: &'a watch::Sender<SessionState>, inflight: &'a AtomicUsize) -> Self {
    state.send_if_modified(|s| {
      inflight.fetch_add(1, Ordering::SeqCst);
      !std::mem::replace(&mut s.is_loading, true)
    });
    Self { state, inflight }
  }
}

impl Drop for LoadingGuard<'_> {
  fn drop(&mut self) {
    self.state.send_if_modified(|s| {
      if self.inflight.fetch_sub(1, Ordering::SeqCst) == 1 {
        std::mem::replace(&mut s.is_loading, false)
      } else {
        false
      }
    });
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Owns the current identity and its persistence.
pub struct SessionStore<K> {
  storage:  K,
  roster:   Roster,
  config:   SessionConfig,
  state:    watch::Sender<SessionState>,
  /// Restores and logins currently running.
  inflight: AtomicUsize,
}

impl<K: SessionStorage> SessionStore<K> {
  /// A store in the `Authenticating` phase; call [`Self::restore`] next.
  pub fn new(storage: K, roster: Roster, config: SessionConfig) -> Self {
    Self {
      storage,
      roster,
      config,
      state: watch::Sender::new(SessionState { identity: None, is_loading: true }),
      inflight: AtomicUsize::new(0),
    }
  }

  /// [`Self::new`] followed by [`Self::restore`].
  pub async fn open(storage: K, roster: Roster, config: SessionConfig) -> Self {
    let store = Self::new(storage, roster, config);
    store.restore().await;
    store
  }

  pub fn roster(&self) -> &Roster { &self.roster }

  pub fn state(&self) -> SessionState { self.state.borrow().clone() }

  pub fn current(&self) -> Option<Identity> { self.state.borrow().identity.clone() }

  pub fn subscribe(&self) -> watch::Receiver<SessionState> { self.state.subscribe() }

  /// Load the persisted identity, if any, and make it current.
  ///
  /// Never fails: a missing, unparseable or unreadable entry all leave the
  /// store logged out. The loading flag is cleared in every case.
  pub async fn restore(&self) -> Option<Identity> {
    let _loading = LoadingGuard::enter(&self.state, &self.inflight);

    let restored = match self.storage.load(SESSION_KEY).await {
      Ok(Some(raw)) => match decode_session(&raw) {
        Ok(identity) => Some(identity),
        Err(e) => {
          tracing::warn!(error = %e, "discarding unreadable persisted session");
          None
        }
      },
      Ok(None) => None,
      Err(e) => {
        tracing::warn!(error = %e, "could not read persisted session");
        None
      }
    };

    if let Some(identity) = &restored {
      tracing::info!(id = %identity.id, role = %identity.role, "restored session");
    }

    self.state.send_modify(|s| s.identity = restored.clone());
    restored
  }

  /// Attempt to sign in.
  ///
  /// Succeeds only when `(id, role)` names a roster entry and the password is
  /// [`DEMO_PASSWORD`]. A failure leaves the current identity untouched.
  pub async fn login(&self, credentials: Credentials) -> Result<Identity, AuthError> {
    if credentials.id.is_empty() {
      return Err(AuthError::MissingField("id"));
    }
    if credentials.password.is_empty() {
      return Err(AuthError::MissingField("password"));
    }

    let _loading = LoadingGuard::enter(&self.state, &self.inflight);

    tokio::time::sleep(self.config.login_delay).await;

    let found = self
      .roster
      .find(&credentials.id, credentials.role)
      .filter(|_| credentials.password == DEMO_PASSWORD)
      .cloned();

    let Some(identity) = found else {
      tracing::info!(id = %credentials.id, role = %credentials.role, "login refused");
      return Err(AuthError::InvalidCredentials);
    };

    match encode_session(&identity) {
      Ok(raw) => {
        if let Err(e) = self.storage.save(SESSION_KEY, raw).await {
          tracing::warn!(error = %e, "could not persist session");
        }
      }
      Err(e) => tracing::warn!(error = %e, "could not encode session"),
    }

    self.state.send_modify(|s| s.identity = Some(identity.clone()));
    tracing::info!(id = %identity.id, role = %identity.role, "logged in");
    Ok(identity)
  }

  /// Clear the current identity and its persisted copy.
  pub async fn logout(&self) {
    let previous = self.state.borrow().identity.as_ref().map(|i| i.id.clone());
    self.state.send_modify(|s| s.identity = None);

    if let Err(e) = self.storage.remove(SESSION_KEY).await {
      tracing::warn!(error = %e, "could not remove persisted session");
    }
    if let Some(id) = previous {
      tracing::info!(%id, "logged out");
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use tokio::time::Instant;

  use super::*;
  use crate::identity::Role;

  fn quick() -> SessionConfig { SessionConfig { login_delay: Duration::ZERO } }

  async fn open(storage: &MemoryStorage) -> SessionStore<MemoryStorage> {
    SessionStore::open(storage.clone(), Roster::builtin(), quick()).await
  }

  fn creds(id: &str, password: &str, role: Role) -> Credentials {
    Credentials::new(id, password, role)
  }

  // ─── Lifecycle ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn starts_authenticating_then_resolves() {
    let store = SessionStore::new(MemoryStorage::default(), Roster::builtin(), quick());
    assert_eq!(store.state().phase(), SessionPhase::Authenticating);

    assert!(store.restore().await.is_none());
    assert_eq!(store.state().phase(), SessionPhase::Unauthenticated);
    assert!(!store.state().is_loading);
  }

  // ─── Login ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn every_roster_entry_logs_in() {
    let storage = MemoryStorage::default();
    let store = open(&storage).await;
    let entries: Vec<_> = store.roster().iter().cloned().collect();

    for entry in entries {
      let identity = store
        .login(creds(&entry.id, DEMO_PASSWORD, entry.role))
        .await
        .unwrap();
      assert_eq!(identity.id, entry.id);
      assert_eq!(identity.role, entry.role);
      assert_eq!(store.current(), Some(entry));
    }
  }

  #[tokio::test]
  async fn alice_logs_in_with_demo_password() {
    let store = open(&MemoryStorage::default()).await;

    let identity = store
      .login(creds("stu001", "password", Role::Student))
      .await
      .unwrap();
    assert_eq!(identity.name, "Alice Williams");
    assert_eq!(store.state().phase(), SessionPhase::Authenticated);

    let err = store
      .login(creds("stu001", "wrong", Role::Student))
      .await
      .unwrap_err();
    assert_eq!(err, AuthError::InvalidCredentials);
  }

  #[tokio::test]
  async fn wrong_password_leaves_identity_unchanged() {
    let storage = MemoryStorage::default();
    let store = open(&storage).await;
    store.login(creds("fac001", DEMO_PASSWORD, Role::Faculty)).await.unwrap();

    for password in ["Password", "password ", "secret"] {
      let res = store.login(creds("stu002", password, Role::Student)).await;
      assert_eq!(res, Err(AuthError::InvalidCredentials));
      assert_eq!(store.current().map(|i| i.id), Some("fac001".to_owned()));
      assert!(!store.state().is_loading);
    }

    let persisted = storage.load(SESSION_KEY).await.unwrap().unwrap();
    assert_eq!(decode_session(&persisted).unwrap().id, "fac001");
  }

  #[tokio::test]
  async fn mismatched_role_fails() {
    let store = open(&MemoryStorage::default()).await;
    for (id, role) in [
      ("stu001", Role::Faculty),
      ("stu001", Role::Admin),
      ("fac002", Role::Student),
      ("admin001", Role::Faculty),
    ] {
      let res = store.login(creds(id, DEMO_PASSWORD, role)).await;
      assert_eq!(res, Err(AuthError::InvalidCredentials));
    }
    assert!(store.current().is_none());
  }

  #[tokio::test]
  async fn empty_fields_are_rejected_without_loading() {
    let store = open(&MemoryStorage::default()).await;
    let mut rx = store.subscribe();
    rx.borrow_and_update();

    assert_eq!(
      store.login(creds("", DEMO_PASSWORD, Role::Admin)).await,
      Err(AuthError::MissingField("id"))
    );
    assert_eq!(
      store.login(creds("admin001", "", Role::Admin)).await,
      Err(AuthError::MissingField("password"))
    );
    assert!(!rx.has_changed().unwrap());
  }

  #[tokio::test(start_paused = true)]
  async fn login_waits_out_the_delay_while_loading() {
    let store = Arc::new(
      SessionStore::open(MemoryStorage::default(), Roster::builtin(), SessionConfig::default())
        .await,
    );
    let mut rx = store.subscribe();
    let started = Instant::now();

    let task = tokio::spawn({
      let store = store.clone();
      async move { store.login(creds("stu001", DEMO_PASSWORD, Role::Student)).await }
    });

    let loading = rx.wait_for(|s| s.is_loading).await.unwrap().clone();
    assert!(loading.identity.is_none());
    assert_eq!(loading.phase(), SessionPhase::Authenticating);

    task.await.unwrap().unwrap();
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(store.state().phase(), SessionPhase::Authenticated);
  }

  #[tokio::test(start_paused = true)]
  async fn abandoned_login_clears_loading() {
    let storage = MemoryStorage::default();
    let store =
      SessionStore::open(storage.clone(), Roster::builtin(), SessionConfig::default()).await;

    let res = tokio::time::timeout(
      Duration::from_millis(100),
      store.login(creds("stu001", DEMO_PASSWORD, Role::Student)),
    )
    .await;
    assert!(res.is_err());

    let state = store.state();
    assert!(!state.is_loading);
    assert!(state.identity.is_none());
    assert!(storage.load(SESSION_KEY).await.unwrap().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn overlapping_logins_stay_loading_until_the_last_finishes() {
    let store = Arc::new(
      SessionStore::open(MemoryStorage::default(), Roster::builtin(), SessionConfig::default())
        .await,
    );

    let first = tokio::spawn({
      let store = store.clone();
      async move { store.login(creds("stu001", DEMO_PASSWORD, Role::Student)).await }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    let second = tokio::spawn({
      let store = store.clone();
      async move { store.login(creds("stu002", DEMO_PASSWORD, Role::Student)).await }
    });

    first.await.unwrap().unwrap();
    let mid = store.state();
    assert!(mid.is_loading);
    assert_eq!(mid.phase(), SessionPhase::Authenticating);
    assert_eq!(mid.identity.map(|i| i.id), Some("stu001".to_owned()));

    second.await.unwrap().unwrap();
    let done = store.state();
    assert!(!done.is_loading);
    assert_eq!(done.phase(), SessionPhase::Authenticated);
    assert_eq!(done.identity.map(|i| i.id), Some("stu002".to_owned()));
  }

  #[tokio::test(start_paused = true)]
  async fn abandoned_login_does_not_end_a_concurrent_one() {
    let store = Arc::new(
      SessionStore::open(MemoryStorage::default(), Roster::builtin(), SessionConfig::default())
        .await,
    );

    let pending = tokio::spawn({
      let store = store.clone();
      async move { store.login(creds("fac001", DEMO_PASSWORD, Role::Faculty)).await }
    });
    tokio::task::yield_now().await;

    let res = tokio::time::timeout(
      Duration::from_millis(100),
      store.login(creds("stu001", DEMO_PASSWORD, Role::Student)),
    )
    .await;
    assert!(res.is_err());
    assert!(store.state().is_loading);

    pending.await.unwrap().unwrap();
    assert!(!store.state().is_loading);
  }

  // ─── Persistence ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn restart_restores_the_same_identity() {
    let storage = MemoryStorage::default();
    let first = open(&storage).await;
    let identity = first
      .login(creds("fac002", DEMO_PASSWORD, Role::Faculty))
      .await
      .unwrap();

    let reloaded = open(&storage).await;
    assert_eq!(reloaded.current(), Some(identity));
    assert_eq!(reloaded.state().phase(), SessionPhase::Authenticated);
  }

  #[tokio::test]
  async fn logout_then_reload_is_logged_out() {
    let storage = MemoryStorage::default();
    let store = open(&storage).await;
    store.login(creds("admin001", DEMO_PASSWORD, Role::Admin)).await.unwrap();
    store.logout().await;
    assert!(store.current().is_none());

    assert!(store.restore().await.is_none());
    assert!(open(&storage).await.current().is_none());
  }

  #[tokio::test]
  async fn corrupt_entry_is_treated_as_logged_out() {
    for raw in ["{not json", "42", r#"{"version":7,"identity":{"id":"x","name":"y","role":"admin"}}"#] {
      let storage = MemoryStorage::default();
      storage.save(SESSION_KEY, raw.to_owned()).await.unwrap();

      let store = open(&storage).await;
      let state = store.state();
      assert!(state.identity.is_none(), "{raw}");
      assert!(!state.is_loading);
    }
  }

  #[tokio::test]
  async fn legacy_bare_identity_is_restored() {
    let storage = MemoryStorage::default();
    let raw = r#"{"id":"stu003","name":"Carol Davis","role":"student","semester":"Semester 4"}"#;
    storage.save(SESSION_KEY, raw.to_owned()).await.unwrap();

    let restored = open(&storage).await.current().unwrap();
    assert_eq!(restored.id, "stu003");
    assert_eq!(restored.semester.as_deref(), Some("Semester 4"));
    assert!(restored.email.is_none());
  }

  #[tokio::test]
  async fn last_login_wins_across_stores() {
    let storage = MemoryStorage::default();
    let tab_a = open(&storage).await;
    let tab_b = open(&storage).await;

    tab_a.login(creds("stu001", DEMO_PASSWORD, Role::Student)).await.unwrap();
    tab_b.login(creds("stu002", DEMO_PASSWORD, Role::Student)).await.unwrap();

    assert_eq!(open(&storage).await.current().map(|i| i.id), Some("stu002".to_owned()));
  }

  #[test]
  fn persisted_form_is_versioned() {
    let identity = Roster::builtin().find("fac001", Role::Faculty).cloned().unwrap();
    let raw = encode_session(&identity).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["version"], 1);
    assert_eq!(value["identity"]["subject"], "Blockchain Technology");
    assert_eq!(decode_session(&raw).unwrap(), identity);
  }
}
