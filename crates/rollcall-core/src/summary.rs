//! Attendance summaries derived from record lists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::{AttendanceRecord, AttendanceStatus};

/// How a student's attendance rate is graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
  /// 90 % or better.
  Excellent,
  /// 75 % or better.
  Good,
  Poor,
}

/// Present/absent counts over a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
  pub total:   usize,
  pub present: usize,
  pub absent:  usize,
}

impl AttendanceSummary {
  pub fn from_records<'a>(
    records: impl IntoIterator<Item = &'a AttendanceRecord>,
  ) -> Self {
    records.into_iter().fold(Self::default(), |mut acc, r| {
      acc.total += 1;
      match r.status {
        AttendanceStatus::Present => acc.present += 1,
        AttendanceStatus::Absent => acc.absent += 1,
      }
      acc
    })
  }

  /// Share of present records, 0–100. An empty summary is 0.
  pub fn percentage(&self) -> f64 {
    if self.total == 0 {
      return 0.0;
    }
    self.present as f64 * 100.0 / self.total as f64
  }

  pub fn standing(&self) -> Standing {
    let pct = self.percentage();
    if pct >= 90.0 {
      Standing::Excellent
    } else if pct >= 75.0 {
      Standing::Good
    } else {
      Standing::Poor
    }
  }
}

/// Per-subject summaries, keyed by subject name.
pub fn summaries_by_subject(
  records: &[AttendanceRecord],
) -> BTreeMap<String, AttendanceSummary> {
  let mut out: BTreeMap<String, Vec<&AttendanceRecord>> = BTreeMap::new();
  for r in records {
    out.entry(r.subject.clone()).or_default().push(r);
  }
  out
    .into_iter()
    .map(|(subject, rs)| (subject, AttendanceSummary::from_records(rs)))
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::record::NewRecord;

  fn rec(subject: &str, status: AttendanceStatus) -> AttendanceRecord {
    AttendanceRecord::assemble(
      "rec".into(),
      NewRecord {
        student_id:   "stu001".into(),
        student_name: "Alice Williams".into(),
        date:         "2024-01-15".into(),
        time:         "09:30".into(),
        status,
        subject:      subject.into(),
        faculty_id:   "fac001".into(),
      },
      "0x".into(),
      "tx_".into(),
      Utc::now(),
    )
  }

  #[test]
  fn empty_summary_is_poor_at_zero() {
    let none: [AttendanceRecord; 0] = [];
    let s = AttendanceSummary::from_records(&none);
    assert_eq!(s.total, 0);
    assert_eq!(s.percentage(), 0.0);
    assert_eq!(s.standing(), Standing::Poor);
  }

  #[test]
  fn standing_thresholds() {
    let mut records: Vec<_> =
      (0..9).map(|_| rec("Networks", AttendanceStatus::Present)).collect();
    records.push(rec("Networks", AttendanceStatus::Absent));
    let s = AttendanceSummary::from_records(&records);
    assert_eq!((s.present, s.absent), (9, 1));
    assert_eq!(s.standing(), Standing::Excellent);

    records.push(rec("Networks", AttendanceStatus::Absent));
    records.push(rec("Networks", AttendanceStatus::Absent));
    assert_eq!(AttendanceSummary::from_records(&records).standing(), Standing::Good);

    let poor = [
      rec("Networks", AttendanceStatus::Present),
      rec("Networks", AttendanceStatus::Absent),
    ];
    assert_eq!(AttendanceSummary::from_records(&poor).standing(), Standing::Poor);
  }

  #[test]
  fn grouped_by_subject() {
    let records = [
      rec("Networks", AttendanceStatus::Present),
      rec("Compilers", AttendanceStatus::Absent),
      rec("Networks", AttendanceStatus::Absent),
    ];
    let by_subject = summaries_by_subject(&records);
    assert_eq!(by_subject.len(), 2);
    assert_eq!(by_subject["Networks"].total, 2);
    assert_eq!(by_subject["Compilers"].absent, 1);
  }
}
