//! Handlers for `/records`, `/students/{id}/summary` and `/ledger/verify`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/records` | Optional `?student_id=` and/or `?subject=` |
//! | `POST` | `/records` | Body: [`NewRecord`]; faculty or admin only; 201 + record |
//! | `GET`  | `/students/{id}/summary` | Overall and per-subject attendance |
//! | `GET`  | `/ledger/verify` | Recomputes the block-hash chain |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rollcall_core::{
  chain::{ChainBreak, verify_chain},
  identity::Role,
  ledger::AttendanceLedger,
  record::{AttendanceRecord, NewRecord},
  session::SessionStorage,
  summary::{AttendanceSummary, Standing, summaries_by_subject},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub student_id: Option<String>,
  pub subject:    Option<String>,
}

/// `GET /records[?student_id=...][&subject=...]`
pub async fn list<K, L>(
  State(state): State<AppState<K, L>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
  K: SessionStorage,
  L: AttendanceLedger,
{
  let ledger = &state.ledger;
  let mut records = match (&params.student_id, &params.subject) {
    (Some(student_id), _) => ledger.student_records(student_id).await,
    (None, Some(subject)) => ledger.subject_records(subject).await,
    (None, None) => ledger.records().await,
  }
  .map_err(ApiError::store)?;

  if let (Some(_), Some(subject)) = (&params.student_id, &params.subject) {
    records.retain(|r| &r.subject == subject);
  }

  Ok(Json(records))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /records`: returns 201 + the stored [`AttendanceRecord`].
pub async fn create<K, L>(
  State(state): State<AppState<K, L>>,
  Json(body): Json<NewRecord>,
) -> Result<impl IntoResponse, ApiError>
where
  K: SessionStorage,
  L: AttendanceLedger,
{
  let identity = state
    .sessions
    .current()
    .ok_or_else(|| ApiError::Unauthorized("sign in to record attendance".into()))?;
  if identity.role == Role::Student {
    return Err(ApiError::Forbidden("students cannot record attendance".into()));
  }

  body
    .validate()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let record = state.ledger.add_record(body).await.map_err(ApiError::store)?;
  tracing::info!(
    id = %record.id,
    by = %identity.id,
    student_id = %record.student_id,
    status = %record.status,
    "attendance recorded"
  );
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SummaryBody {
  #[serde(flatten)]
  pub counts:     AttendanceSummary,
  pub percentage: f64,
  pub standing:   Standing,
}

impl From<AttendanceSummary> for SummaryBody {
  fn from(counts: AttendanceSummary) -> Self {
    Self { percentage: counts.percentage(), standing: counts.standing(), counts }
  }
}

#[derive(Debug, Serialize)]
pub struct StudentSummary {
  pub student_id: String,
  pub overall:    SummaryBody,
  pub subjects:   BTreeMap<String, SummaryBody>,
}

/// `GET /students/{id}/summary`
pub async fn student_summary<K, L>(
  State(state): State<AppState<K, L>>,
  Path(student_id): Path<String>,
) -> Result<Json<StudentSummary>, ApiError>
where
  K: SessionStorage,
  L: AttendanceLedger,
{
  let records = state
    .ledger
    .student_records(&student_id)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(StudentSummary {
    overall: AttendanceSummary::from_records(&records).into(),
    subjects: summaries_by_subject(&records)
      .into_iter()
      .map(|(subject, s)| (subject, s.into()))
      .collect(),
    student_id,
  }))
}

// ─── Verify ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct VerifyBody {
  pub valid:  bool,
  pub height: usize,
  #[serde(rename = "break", skip_serializing_if = "Option::is_none")]
  pub broken: Option<ChainBreak>,
}

/// `GET /ledger/verify`
pub async fn verify<K, L>(
  State(state): State<AppState<K, L>>,
) -> Result<Json<VerifyBody>, ApiError>
where
  K: SessionStorage,
  L: AttendanceLedger,
{
  let records = state.ledger.records().await.map_err(ApiError::store)?;
  let broken = verify_chain(&records).err();
  if let Some(b) = &broken {
    tracing::warn!(index = b.index, record_id = %b.record_id, "ledger chain broken");
  }
  Ok(Json(VerifyBody { valid: broken.is_none(), height: records.len(), broken }))
}
