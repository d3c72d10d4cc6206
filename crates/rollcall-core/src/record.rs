//! Attendance records, the immutable facts held by the ledger.
//!
//! A record is never updated or deleted once appended. Its id, integrity
//! tokens and `recorded_at` timestamp are assigned by the ledger, never by the
//! caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Whether the student attended.
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
pub enum AttendanceStatus {
  Present,
  Absent,
}

// ─── NewRecord ───────────────────────────────────────────────────────────────

/// Input to [`crate::ledger::AttendanceLedger::add_record`].
///
/// Every field is an opaque caller-supplied string; none is checked for
/// referential integrity against the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
  pub student_id:   String,
  pub student_name: String,
  pub date:         String,
  pub time:         String,
  pub status:       AttendanceStatus,
  pub subject:      String,
  pub faculty_id:   String,
}

impl NewRecord {
  /// Reject records whose identifying fields are blank.
  ///
  /// Ledgers accept anything; this check is for callers that want a stricter
  /// contract (the HTTP layer applies it).
  pub fn validate(&self) -> Result<()> {
    let required = [
      ("student_id", &self.student_id),
      ("subject", &self.subject),
      ("faculty_id", &self.faculty_id),
      ("date", &self.date),
    ];
    for (field, value) in required {
      if value.trim().is_empty() {
        return Err(Error::MissingField(field));
      }
    }
    Ok(())
  }
}

// ─── AttendanceRecord ────────────────────────────────────────────────────────

/// An appended attendance fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub id:             String,
  pub student_id:     String,
  pub student_name:   String,
  pub date:           String,
  pub time:           String,
  pub status:         AttendanceStatus,
  pub subject:        String,
  pub faculty_id:     String,
  /// `0x`-prefixed SHA-256 linking this record to its predecessor.
  pub block_hash:     String,
  pub transaction_id: String,
  /// Store-assigned; never changes after creation.
  pub recorded_at:    DateTime<Utc>,
}

impl AttendanceRecord {
  /// Assemble a record from caller input and ledger-assigned values.
  pub fn assemble(
    id: String,
    input: NewRecord,
    block_hash: String,
    transaction_id: String,
    recorded_at: DateTime<Utc>,
  ) -> Self {
    Self {
      id,
      student_id: input.student_id,
      student_name: input.student_name,
      date: input.date,
      time: input.time,
      status: input.status,
      subject: input.subject,
      faculty_id: input.faculty_id,
      block_hash,
      transaction_id,
      recorded_at,
    }
  }

  pub fn is_present(&self) -> bool { self.status == AttendanceStatus::Present }
}

/// Generate a fresh record id. Ids are time-ordered (UUIDv7) and unique.
pub fn new_record_id() -> String { format!("rec_{}", Uuid::now_v7().simple()) }
