//! The roster: the fixed, compiled-in list of identities that can sign in.

use crate::identity::{Identity, Role};

/// The only password the demo roster accepts.
pub const DEMO_PASSWORD: &str = "password";

/// A fixed set of known identities, looked up by exact `(id, role)` match.
#[derive(Debug, Clone)]
pub struct Roster {
  entries: Vec<Identity>,
}

impl Roster {
  pub fn new(entries: Vec<Identity>) -> Self { Self { entries } }

  /// The built-in demo roster: one administrator, two faculty members and
  /// three students.
  pub fn builtin() -> Self {
    let email = |address: &str| Some(address.to_owned());
    let text = |s: &str| Some(s.to_owned());

    Self::new(vec![
      Identity {
        email: email("admin@university.edu"),
        ..Identity::new("admin001", "System Administrator", Role::Admin)
      },
      Identity {
        email: email("sarah.johnson@university.edu"),
        department: text("Computer Science"),
        subject: text("Blockchain Technology"),
        ..Identity::new("fac001", "Dr. Sarah Johnson", Role::Faculty)
      },
      Identity {
        email: email("michael.chen@university.edu"),
        department: text("Information Systems"),
        subject: text("Database Management"),
        ..Identity::new("fac002", "Prof. Michael Chen", Role::Faculty)
      },
      Identity {
        email: email("alice.williams@student.university.edu"),
        department: text("Computer Science"),
        semester: text("Semester 6"),
        ..Identity::new("stu001", "Alice Williams", Role::Student)
      },
      Identity {
        email: email("bob.martinez@student.university.edu"),
        department: text("Computer Science"),
        semester: text("Semester 6"),
        ..Identity::new("stu002", "Bob Martinez", Role::Student)
      },
      Identity {
        email: email("carol.davis@student.university.edu"),
        department: text("Information Systems"),
        semester: text("Semester 4"),
        ..Identity::new("stu003", "Carol Davis", Role::Student)
      },
    ])
  }

  /// Find the entry whose id AND role both match.
  pub fn find(&self, id: &str, role: Role) -> Option<&Identity> {
    self.entries.iter().find(|e| e.id == id && e.role == role)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Identity> { self.entries.iter() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl Default for Roster {
  fn default() -> Self { Self::builtin() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtin_ids_are_unique() {
    let roster = Roster::builtin();
    let mut ids: Vec<_> = roster.iter().map(|e| e.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), roster.len());
  }

  #[test]
  fn find_requires_matching_role() {
    let roster = Roster::builtin();
    assert_eq!(
      roster.find("stu001", Role::Student).map(|e| e.name.as_str()),
      Some("Alice Williams")
    );
    assert!(roster.find("stu001", Role::Faculty).is_none());
    assert!(roster.find("STU001", Role::Student).is_none());
  }
}
