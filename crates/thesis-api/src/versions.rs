//! Handlers for `/thesis/versions` endpoints.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use thesis_core::{
  identity::IdentityProvider,
  store::ThesisStore,
  thesis::ThesisVersion,
  versions::{self, VersionUpload},
};
use uuid::Uuid;

use crate::{
  AppState,
  comments::StudentParams,
  error::ApiError,
  extract::{CurrentIdentity, JsonBody},
};

/// `GET /thesis/versions[?student_id=<id>]`: oldest first.
pub async fn list<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Query(params): Query<StudentParams>,
) -> Result<Json<Vec<ThesisVersion>>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  let student_id = params.student_id.unwrap_or_else(|| identity.id.clone());
  Ok(Json(
    versions::list_versions(state.store.as_ref(), &identity, student_id).await?,
  ))
}

/// `POST /thesis/versions`: body: `{"title", "file_url", "notes"?, "is_final"?}`
pub async fn upload<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  JsonBody(body): JsonBody<VersionUpload>,
) -> Result<Json<ThesisVersion>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(
    versions::upload_version(state.store.as_ref(), &identity, body).await?,
  ))
}

/// `POST /thesis/versions/{id}/final`
pub async fn mark_final<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Path(id): Path<Uuid>,
) -> Result<Json<ThesisVersion>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(versions::mark_final(state.store.as_ref(), &identity, id).await?))
}
