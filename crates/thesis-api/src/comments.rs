//! Handlers for `/comments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/comments` | `?student_id=` (default: the caller) |
//! | `POST` | `/comments` | Supervisor only; body: `{"student_id", "content", "thesis_version_id"?}` |
//! | `POST` | `/comments/{id}/resolve` | The addressed student only |
//! | `POST` | `/comments/{id}/approve` | The authoring supervisor only |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use thesis_core::{
  comment::Comment,
  feedback::{self, CommentInput},
  identity::IdentityProvider,
  store::ThesisStore,
};
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  extract::{CurrentIdentity, JsonBody},
};

/// `?student_id=` filter shared with the versions endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct StudentParams {
  pub student_id: Option<String>,
}

/// `GET /comments[?student_id=<id>]`
pub async fn list<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Query(params): Query<StudentParams>,
) -> Result<Json<Vec<Comment>>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  let student_id = params.student_id.unwrap_or_else(|| identity.id.clone());
  Ok(Json(
    feedback::list_comments(state.store.as_ref(), &identity, student_id).await?,
  ))
}

/// `POST /comments`
pub async fn create<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  JsonBody(body): JsonBody<CommentInput>,
) -> Result<Json<Comment>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(feedback::add_comment(state.store.as_ref(), &identity, body).await?))
}

/// `POST /comments/{id}/resolve`
pub async fn resolve<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Path(id): Path<Uuid>,
) -> Result<Json<Comment>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(
    feedback::resolve_comment(state.store.as_ref(), &identity, id).await?,
  ))
}

/// `POST /comments/{id}/approve`
pub async fn approve<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Path(id): Path<Uuid>,
) -> Result<Json<Comment>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(
    feedback::approve_comment(state.store.as_ref(), &identity, id).await?,
  ))
}
