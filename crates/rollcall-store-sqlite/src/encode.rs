//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; the status enum as its
//! lowercase name.

use chrono::{DateTime, Utc};
use rollcall_core::record::{AttendanceRecord, AttendanceStatus};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── AttendanceStatus ────────────────────────────────────────────────────────

pub fn encode_status(status: AttendanceStatus) -> &'static str {
  match status {
    AttendanceStatus::Present => "present",
    AttendanceStatus::Absent => "absent",
  }
}

pub fn decode_status(s: &str) -> Result<AttendanceStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown attendance status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "record_id, student_id, student_name, date, time, status,
   subject, faculty_id, block_hash, transaction_id, recorded_at";

/// Raw strings read directly from a `records` row.
pub struct RawRecord {
  pub record_id:      String,
  pub student_id:     String,
  pub student_name:   String,
  pub date:           String,
  pub time:           String,
  pub status:         String,
  pub subject:        String,
  pub faculty_id:     String,
  pub block_hash:     String,
  pub transaction_id: String,
  pub recorded_at:    String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:      row.get(0)?,
      student_id:     row.get(1)?,
      student_name:   row.get(2)?,
      date:           row.get(3)?,
      time:           row.get(4)?,
      status:         row.get(5)?,
      subject:        row.get(6)?,
      faculty_id:     row.get(7)?,
      block_hash:     row.get(8)?,
      transaction_id: row.get(9)?,
      recorded_at:    row.get(10)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      id:             self.record_id,
      student_id:     self.student_id,
      student_name:   self.student_name,
      date:           self.date,
      time:           self.time,
      status:         decode_status(&self.status)?,
      subject:        self.subject,
      faculty_id:     self.faculty_id,
      block_hash:     self.block_hash,
      transaction_id: self.transaction_id,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_text_roundtrips() {
    for status in [AttendanceStatus::Present, AttendanceStatus::Absent] {
      assert_eq!(decode_status(encode_status(status)).unwrap(), status);
    }
    assert!(matches!(decode_status("late"), Err(Error::Decode(_))));
  }

  #[test]
  fn bad_timestamp_is_reported() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
