//! SQL schema for the Rollcall SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Attendance records are strictly append-only.
-- `seq` fixes insertion order, which the block-hash chain depends on.
CREATE TABLE IF NOT EXISTS records (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id      TEXT NOT NULL UNIQUE,
    student_id     TEXT NOT NULL,
    student_name   TEXT NOT NULL,
    date           TEXT NOT NULL,
    time           TEXT NOT NULL,
    status         TEXT NOT NULL CHECK (status IN ('present', 'absent')),
    subject        TEXT NOT NULL,
    faculty_id     TEXT NOT NULL,
    block_hash     TEXT NOT NULL UNIQUE,
    transaction_id TEXT NOT NULL UNIQUE,
    recorded_at    TEXT NOT NULL   -- ISO 8601 UTC; store-assigned
);

CREATE TRIGGER IF NOT EXISTS records_no_update
BEFORE UPDATE ON records
BEGIN
    SELECT RAISE(ABORT, 'attendance records are append-only');
END;

CREATE TRIGGER IF NOT EXISTS records_no_delete
BEFORE DELETE ON records
BEGIN
    SELECT RAISE(ABORT, 'attendance records are append-only');
END;

CREATE INDEX IF NOT EXISTS records_student_idx ON records(student_id);
CREATE INDEX IF NOT EXISTS records_subject_idx ON records(subject);

-- Stand-in for browser local storage: one row per key.
CREATE TABLE IF NOT EXISTS session_storage (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

PRAGMA user_version = 1;
";
