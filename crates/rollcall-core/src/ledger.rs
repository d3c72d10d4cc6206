//! The `AttendanceLedger` trait and the in-memory backend.
//!
//! The trait is implemented by storage backends (e.g. `rollcall-store-sqlite`)
//! and by [`MemoryLedger`]. Higher layers (`rollcall-api`) depend on this
//! abstraction, not on any concrete backend.

use std::{
  collections::HashSet,
  convert::Infallible,
  future::Future,
  sync::{PoisonError, RwLock},
};

use chrono::Utc;
use tokio::sync::watch;

use crate::{
  chain,
  record::{AttendanceRecord, AttendanceStatus, NewRecord, new_record_id},
};

// ─── Head ────────────────────────────────────────────────────────────────────

/// Published to subscribers after every append.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerHead {
  /// Number of records in the ledger.
  pub height:    u64,
  /// Block hash of the newest record; `None` while the ledger is empty.
  pub head_hash: Option<String>,
}

impl LedgerHead {
  pub fn of(records: &[AttendanceRecord]) -> Self {
    Self {
      height:    records.len() as u64,
      head_hash: records.last().map(|r| r.block_hash.clone()),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an append-only attendance record store.
///
/// There is no update or delete: records only accumulate. Read methods
/// return records in insertion order.
pub trait AttendanceLedger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append a record. The id, `block_hash`, `transaction_id` and
  /// `recorded_at` are assigned by the ledger.
  fn add_record(
    &self,
    input: NewRecord,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  /// Every record, oldest first.
  fn records(
    &self,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Records whose `student_id` equals `student_id`.
  fn student_records<'a>(
    &'a self,
    student_id: &'a str,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + 'a;

  /// Records whose `subject` equals `subject`.
  fn subject_records<'a>(
    &'a self,
    subject: &'a str,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + 'a;

  /// Observe the ledger head; the receiver is marked changed after each
  /// append.
  fn subscribe(&self) -> watch::Receiver<LedgerHead>;
}

// ─── Seed data ───────────────────────────────────────────────────────────────

/// The demo records a fresh ledger can be seeded with.
pub fn seed_records() -> Vec<NewRecord> {
  [
    ("stu001", "Alice Williams", AttendanceStatus::Present),
    ("stu002", "Bob Martinez", AttendanceStatus::Present),
    ("stu003", "Carol Davis", AttendanceStatus::Absent),
  ]
  .into_iter()
  .map(|(student_id, student_name, status)| NewRecord {
    student_id: student_id.into(),
    student_name: student_name.into(),
    date: "2024-01-15".into(),
    time: "09:30".into(),
    status,
    subject: "Blockchain Technology".into(),
    faculty_id: "fac001".into(),
  })
  .collect()
}

/// Append [`seed_records`] to `ledger` if it holds no records yet.
///
/// Returns whether anything was appended. A ledger that already has records
/// is left alone, so calling this on every start never duplicates the seed.
pub async fn seed_if_empty<L: AttendanceLedger>(ledger: &L) -> Result<bool, L::Error> {
  let empty = ledger.subscribe().borrow().height == 0;
  if !empty {
    return Ok(false);
  }
  for input in seed_records() {
    ledger.add_record(input).await?;
  }
  Ok(true)
}

// ─── MemoryLedger ────────────────────────────────────────────────────────────

#[derive(Default)]
struct Inner {
  records:         Vec<AttendanceRecord>,
  transaction_ids: HashSet<String>,
}

/// A ledger that lives for the lifetime of the process.
pub struct MemoryLedger {
  inner: RwLock<Inner>,
  head:  watch::Sender<LedgerHead>,
}

impl MemoryLedger {
  pub fn new() -> Self {
    Self {
      inner: RwLock::new(Inner::default()),
      head:  watch::Sender::new(LedgerHead::default()),
    }
  }

  /// A ledger pre-populated with `records`, appended in order.
  pub fn with_seed(records: impl IntoIterator<Item = NewRecord>) -> Self {
    let ledger = Self::new();
    for input in records {
      ledger.append(input);
    }
    ledger
  }

  fn append(&self, input: NewRecord) -> AttendanceRecord {
    let record = {
      let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

      let mut transaction_id = chain::transaction_id();
      while inner.transaction_ids.contains(&transaction_id) {
        transaction_id = chain::transaction_id();
      }

      let mut record = AttendanceRecord::assemble(
        new_record_id(),
        input,
        String::new(),
        transaction_id,
        Utc::now(),
      );
      record.block_hash = chain::block_hash(chain::head_hash(&inner.records), &record);

      inner.transaction_ids.insert(record.transaction_id.clone());
      inner.records.push(record.clone());
      self.head.send_replace(LedgerHead::of(&inner.records));
      record
    };

    tracing::debug!(id = %record.id, student_id = %record.student_id, "appended attendance record");
    record
  }

  fn filtered(&self, keep: impl Fn(&AttendanceRecord) -> bool) -> Vec<AttendanceRecord> {
    let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
    inner.records.iter().filter(|r| keep(r)).cloned().collect()
  }
}

impl Default for MemoryLedger {
  fn default() -> Self { Self::new() }
}

impl AttendanceLedger for MemoryLedger {
  type Error = Infallible;

  async fn add_record(&self, input: NewRecord) -> Result<AttendanceRecord, Infallible> {
    Ok(self.append(input))
  }

  async fn records(&self) -> Result<Vec<AttendanceRecord>, Infallible> {
    Ok(self.filtered(|_| true))
  }

  async fn student_records(&self, student_id: &str) -> Result<Vec<AttendanceRecord>, Infallible> {
    Ok(self.filtered(|r| r.student_id == student_id))
  }

  async fn subject_records(&self, subject: &str) -> Result<Vec<AttendanceRecord>, Infallible> {
    Ok(self.filtered(|r| r.subject == subject))
  }

  fn subscribe(&self) -> watch::Receiver<LedgerHead> { self.head.subscribe() }
}
