//! Integrity tokens for attendance records.
//!
//! Every record carries a `block_hash` computed over its predecessor's hash
//! and a canonical encoding of its own fields, so the ledger forms a hash
//! chain: altering or reordering any stored record breaks every hash after
//! it. The `transaction_id` is a random opaque token.

use rand_core::{OsRng, RngCore as _};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::record::AttendanceRecord;

/// The hash the first record in a ledger chains from.
pub const GENESIS_HASH: &str =
  "0x0000000000000000000000000000000000000000000000000000000000000000";

const TRANSACTION_ID_BYTES: usize = 6;

/// A fresh `tx_`-prefixed token of 12 lowercase hex characters.
pub fn transaction_id() -> String {
  let mut bytes = [0u8; TRANSACTION_ID_BYTES];
  OsRng.fill_bytes(&mut bytes);
  format!("tx_{}", hex::encode(bytes))
}

/// Compute the block hash of `record` when appended after `prev`.
///
/// The record's own `block_hash` and `recorded_at` do not take part.
pub fn block_hash(prev: &str, record: &AttendanceRecord) -> String {
  let mut hasher = Sha256::new();
  let parts = [
    prev,
    record.id.as_str(),
    record.transaction_id.as_str(),
    record.student_id.as_str(),
    record.student_name.as_str(),
    record.date.as_str(),
    record.time.as_str(),
    record.status.as_ref(),
    record.subject.as_str(),
    record.faculty_id.as_str(),
  ];
  // Length prefixes keep ("ab", "c") and ("a", "bc") apart.
  for part in parts {
    hasher.update((part.len() as u64).to_be_bytes());
    hasher.update(part.as_bytes());
  }
  format!("0x{}", hex::encode(hasher.finalize()))
}

/// The hash the next appended record should chain from.
pub fn head_hash(records: &[AttendanceRecord]) -> &str {
  records.last().map_or(GENESIS_HASH, |r| r.block_hash.as_str())
}

/// The first record whose stored hash does not match its recomputed hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("chain broken at index {index} (record {record_id})")]
pub struct ChainBreak {
  pub index:     usize,
  pub record_id: String,
}

/// Recompute every hash in insertion order.
pub fn verify_chain(records: &[AttendanceRecord]) -> Result<(), ChainBreak> {
  let mut prev = GENESIS_HASH;
  for (index, record) in records.iter().enumerate() {
    if block_hash(prev, record) != record.block_hash {
      return Err(ChainBreak { index, record_id: record.id.clone() });
    }
    prev = &record.block_hash;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::record::{AttendanceStatus, NewRecord};

  fn chained(n: usize) -> Vec<AttendanceRecord> {
    let mut out: Vec<AttendanceRecord> = Vec::new();
    for i in 0..n {
      let mut rec = AttendanceRecord::assemble(
        format!("rec_{i}"),
        NewRecord {
          student_id:   format!("stu{i:03}"),
          student_name: "Student".into(),
          date:         "2024-01-15".into(),
          time:         "09:30".into(),
          status:       AttendanceStatus::Present,
          subject:      "Blockchain Technology".into(),
          faculty_id:   "fac001".into(),
        },
        String::new(),
        transaction_id(),
        Utc::now(),
      );
      rec.block_hash = block_hash(head_hash(&out), &rec);
      out.push(rec);
    }
    out
  }

  #[test]
  fn token_formats() {
    let tx = transaction_id();
    assert_eq!(tx.len(), 3 + 2 * TRANSACTION_ID_BYTES);
    assert!(tx.starts_with("tx_"));
    assert!(tx[3..].chars().all(|c| c.is_ascii_hexdigit()));

    let records = chained(1);
    assert_eq!(records[0].block_hash.len(), GENESIS_HASH.len());
    assert!(records[0].block_hash.starts_with("0x"));
  }

  #[test]
  fn untouched_chain_verifies() {
    assert_eq!(verify_chain(&chained(4)), Ok(()));
    assert_eq!(verify_chain(&[]), Ok(()));
  }

  #[test]
  fn edited_record_breaks_chain() {
    let mut records = chained(4);
    records[2].status = AttendanceStatus::Absent;
    let err = verify_chain(&records).unwrap_err();
    assert_eq!(err.index, 2);
    assert_eq!(err.record_id, "rec_2");
  }

  #[test]
  fn reordering_breaks_chain() {
    let mut records = chained(3);
    records.swap(0, 1);
    assert_eq!(verify_chain(&records).unwrap_err().index, 0);
  }
}
