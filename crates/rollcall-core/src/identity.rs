//! Identity: the authenticated principal of a session.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// The three roles an identity can hold. Fixed for the identity's lifetime.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Faculty,
  Student,
}

/// A principal that can sign in.
///
/// The optional attributes are descriptive only and depend on the role: a
/// student usually carries a `semester`, a faculty member a `subject`. None
/// of them are validated against the role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:         String,
  pub name:       String,
  pub role:       Role,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub department: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub semester:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subject:    Option<String>,
}

impl Identity {
  /// An identity with only the mandatory fields set.
  pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      role,
      email: None,
      department: None,
      semester: None,
      subject: None,
    }
  }
}

/// Transient login input. Never stored beyond the login call.
#[derive(Clone, Deserialize)]
pub struct Credentials {
  pub id:       String,
  pub password: String,
  pub role:     Role,
}

impl Credentials {
  pub fn new(
    id: impl Into<String>,
    password: impl Into<String>,
    role: Role,
  ) -> Self {
    Self { id: id.into(), password: password.into(), role }
  }
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("id", &self.id)
      .field("password", &"<redacted>")
      .field("role", &self.role)
      .finish()
  }
}
