//! Handlers for `/proposals` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/proposals` | Student submission; runs automatic allocation |
//! | `GET`   | `/proposals` | `?status=pending\|approved\|rejected\|all` (default `pending`), `?unassigned=true` |
//! | `GET`   | `/proposals/{id}` | 404 if not found or not visible |
//! | `PATCH` | `/proposals/{id}` | Body: `{"status"?, "feedback"?, "assigned_supervisor_id"?}` |
//! | `GET`   | `/proposals/{id}/assignments` | Assignment history, oldest first |

use std::str::FromStr;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use thesis_core::{
  identity::IdentityProvider,
  proposal::{Assignment, Proposal, ProposalStatus},
  store::{ProposalQuery, ThesisStore},
  workflow::{self, ProposalPatch, Submission, SubmitProposal},
};
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  extract::{CurrentIdentity, JsonBody},
};

// ─── Submit ──────────────────────────────────────────────────────────────────

/// `POST /proposals`: body: `{"topic":"...", "summary"?:"..."}`
pub async fn submit<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  JsonBody(body): JsonBody<SubmitProposal>,
) -> Result<Json<Submission>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  let submission = workflow::submit_proposal(state.store.as_ref(), &identity, body).await?;
  Ok(Json(submission))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub status:     Option<String>,
  #[serde(default)]
  pub unassigned: bool,
}

impl ListParams {
  fn into_query(self) -> Result<ProposalQuery, ApiError> {
    let status = match self.status.as_deref() {
      None => Some(ProposalStatus::Pending),
      Some("all") => None,
      Some(s) => Some(
        ProposalStatus::from_str(s)
          .map_err(|_| ApiError::BadRequest(format!("unknown status {s:?}")))?,
      ),
    };
    Ok(ProposalQuery {
      status,
      unassigned_only: self.unassigned,
      student_id: None,
    })
  }
}

/// `GET /proposals[?status=<status>][&unassigned=true]`
pub async fn list<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Proposal>>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  let query = params.into_query()?;
  Ok(Json(
    workflow::list_proposals(state.store.as_ref(), &identity, query).await?,
  ))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /proposals/{id}`
pub async fn get_one<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Path(id): Path<Uuid>,
) -> Result<Json<Proposal>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(workflow::get_proposal(state.store.as_ref(), &identity, id).await?))
}

/// `GET /proposals/{id}/assignments`
pub async fn assignments<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Assignment>>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(workflow::assignments(state.store.as_ref(), &identity, id).await?))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /proposals/{id}`
pub async fn update<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Path(id): Path<Uuid>,
  JsonBody(patch): JsonBody<ProposalPatch>,
) -> Result<Json<Value>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  let proposal = workflow::update_proposal(state.store.as_ref(), &identity, id, patch).await?;
  Ok(Json(json!({ "ok": true, "proposal": proposal })))
}
