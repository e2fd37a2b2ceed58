//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/bootstrap` | Create or sync the caller's local user |
//! | `GET`  | `/auth/me` | Identity, local user, role and dashboard route |
//! | `POST` | `/auth/register` | Public student sign-up |

use axum::{Json, extract::State};
use serde_json::{Value, json};
use thesis_core::{
  bridge::{self, Me, Registration},
  identity::IdentityProvider,
  store::ThesisStore,
  user::User,
};

use crate::{
  AppState,
  error::ApiError,
  extract::{CurrentIdentity, JsonBody},
};

/// `POST /auth/bootstrap`
pub async fn bootstrap<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<User>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(bridge::bootstrap(state.store.as_ref(), &identity).await?))
}

/// `GET /auth/me`
pub async fn me<S, P>(
  State(state): State<AppState<S, P>>,
  CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<Me>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Ok(Json(bridge::me(state.store.as_ref(), &identity).await?))
}

/// `POST /auth/register`: body: `{"email", "password", "first_name"?, ...}`
pub async fn register<S, P>(
  State(state): State<AppState<S, P>>,
  JsonBody(body): JsonBody<Registration>,
) -> Result<Json<Value>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  let settings = state.settings.read().await.clone();
  let user = bridge::register_student(
    state.store.as_ref(),
    state.identity.as_ref(),
    &settings,
    body,
  )
  .await?;
  Ok(Json(json!({ "ok": true, "user": user })))
}
