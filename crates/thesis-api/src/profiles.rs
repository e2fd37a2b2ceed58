//! Handlers for student and supervisor profile endpoints.

use axum::{
  Json,
  extract::{Path, State},
};
use thesis_core::{
  identity::IdentityProvider,
  profile::{StudentProfile, SupervisorProfile},
  store::ThesisStore,
  workflow,
};

use crate::{AppState, error::ApiError, extract::CurrentIdentity};

/// `GET /profile/student`: the caller's own profile.
pub async fn my_student_profile<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<StudentProfile>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  let id = identity.id.clone();
  Ok(Json(
    workflow::student_profile(state.store.as_ref(), &identity, id).await?,
  ))
}

/// `GET /students/{id}`
pub async fn student<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Path(id): Path<String>,
) -> Result<Json<StudentProfile>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(
    workflow::student_profile(state.store.as_ref(), &identity, id).await?,
  ))
}

/// `GET /supervisors`: the allocation roster.
pub async fn supervisors<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(_): CurrentIdentity,
) -> Result<Json<Vec<SupervisorProfile>>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  let roster = state
    .store
    .list_supervisor_profiles()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(roster))
}

/// `GET /supervisors/{id}`
pub async fn supervisor<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(_): CurrentIdentity,
  Path(id): Path<String>,
) -> Result<Json<SupervisorProfile>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  let profile = state
    .store
    .get_supervisor_profile(id.clone())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("supervisor {id} not found")))?;
  Ok(Json(profile))
}

/// `GET /supervisors/{id}/students`
pub async fn supervisor_students<S, P>(
  State(state): State<AppState<S, P>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<StudentProfile>>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(workflow::students_of(state.store.as_ref(), id).await?))
}
