//! Handlers for `/notifications` endpoints. Callers only ever see and touch
//! their own notifications.

use axum::{
  Json,
  extract::{Path, State},
};
use thesis_core::{
  feedback,
  identity::IdentityProvider,
  notification::{Feed, Notification},
  store::ThesisStore,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentIdentity};

/// `GET /notifications`: newest first, with the unread count.
pub async fn feed<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<Feed>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(feedback::feed(state.store.as_ref(), &identity).await?))
}

/// `POST /notifications/{id}/read`
pub async fn read<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(feedback::mark_read(state.store.as_ref(), &identity, id).await?))
}

/// `POST /notifications/{id}/resolve`
pub async fn resolve<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
  Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(
    feedback::mark_resolved(state.store.as_ref(), &identity, id).await?,
  ))
}
