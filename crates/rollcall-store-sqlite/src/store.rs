//! [`SqliteStore`]: the SQLite implementation of [`AttendanceLedger`] and
//! [`SessionStorage`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::watch;

use rollcall_core::{
  chain,
  ledger::{AttendanceLedger, LedgerHead},
  record::{AttendanceRecord, NewRecord, new_record_id},
  session::SessionStorage,
};

use crate::{
  Result,
  encode::{RECORD_COLUMNS, RawRecord, encode_dt, encode_status},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance ledger and session storage backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection and head channel are
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  head: Arc<watch::Sender<LedgerHead>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (height, head_hash) = conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        let height: i64 =
          conn.query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))?;
        let head_hash: Option<String> = conn
          .query_row(
            "SELECT block_hash FROM records ORDER BY seq DESC LIMIT 1",
            [],
            |r| r.get(0),
          )
          .optional()?;
        Ok((height, head_hash))
      })
      .await?;

    let head = LedgerHead { height: height as u64, head_hash };
    Ok(Self { conn, head: Arc::new(watch::Sender::new(head)) })
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  /// Select records, optionally restricted to rows where `column = value`.
  ///
  /// `column` is always a literal chosen by this module, never user input.
  async fn select_records(
    &self,
    filter: Option<(&'static str, String)>,
  ) -> Result<Vec<AttendanceRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let rows = if let Some((column, value)) = filter {
          let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE {column} = ?1 ORDER BY seq"
          ))?;
          stmt
            .query_map(rusqlite::params![value], RawRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn
            .prepare(&format!("SELECT {RECORD_COLUMNS} FROM records ORDER BY seq"))?;
          stmt
            .query_map([], RawRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

// ─── AttendanceLedger impl ───────────────────────────────────────────────────

impl AttendanceLedger for SqliteStore {
  type Error = crate::Error;

  async fn add_record(&self, input: NewRecord) -> Result<AttendanceRecord> {
    let recorded_at = Utc::now();

    // Head lookup and insert share one transaction so the chain cannot fork.
    // The head is published on the connection thread, where appends are
    // serialised, so observers never see an older head after a newer one.
    let head = Arc::clone(&self.head);
    let record: AttendanceRecord = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let prev: Option<String> = tx
          .query_row(
            "SELECT block_hash FROM records ORDER BY seq DESC LIMIT 1",
            [],
            |r| r.get(0),
          )
          .optional()?;

        let mut transaction_id = chain::transaction_id();
        while tx
          .query_row(
            "SELECT 1 FROM records WHERE transaction_id = ?1",
            rusqlite::params![transaction_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some()
        {
          transaction_id = chain::transaction_id();
        }

        let mut record = AttendanceRecord::assemble(
          new_record_id(),
          input,
          String::new(),
          transaction_id,
          recorded_at,
        );
        record.block_hash = chain::block_hash(
          prev.as_deref().unwrap_or(chain::GENESIS_HASH),
          &record,
        );

        tx.execute(
          "INSERT INTO records (
             record_id, student_id, student_name, date, time, status,
             subject, faculty_id, block_hash, transaction_id, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            record.id,
            record.student_id,
            record.student_name,
            record.date,
            record.time,
            encode_status(record.status),
            record.subject,
            record.faculty_id,
            record.block_hash,
            record.transaction_id,
            encode_dt(record.recorded_at),
          ],
        )?;

        let height: i64 =
          tx.query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))?;
        tx.commit()?;

        head.send_replace(LedgerHead {
          height:    height as u64,
          head_hash: Some(record.block_hash.clone()),
        });
        Ok(record)
      })
      .await?;

    tracing::debug!(id = %record.id, student_id = %record.student_id, "appended attendance record");

    Ok(record)
  }

  async fn records(&self) -> Result<Vec<AttendanceRecord>> {
    self.select_records(None).await
  }

  async fn student_records(&self, student_id: &str) -> Result<Vec<AttendanceRecord>> {
    self
      .select_records(Some(("student_id", student_id.to_owned())))
      .await
  }

  async fn subject_records(&self, subject: &str) -> Result<Vec<AttendanceRecord>> {
    self.select_records(Some(("subject", subject.to_owned()))).await
  }

  fn subscribe(&self) -> watch::Receiver<LedgerHead> { self.head.subscribe() }
}

// ─── SessionStorage impl ─────────────────────────────────────────────────────

impl SessionStorage for SqliteStore {
  type Error = crate::Error;

  async fn load(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT value FROM session_storage WHERE key = ?1",
            rusqlite::params![key],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;
    Ok(value)
  }

  async fn save(&self, key: &str, value: String) -> Result<()> {
    let key = key.to_owned();
    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO session_storage (key, value, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                          updated_at = excluded.updated_at",
          rusqlite::params![key, value, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM session_storage WHERE key = ?1",
          rusqlite::params![key],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
