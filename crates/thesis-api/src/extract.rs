//! Request extractors for the caller's identity and admin credentials.
//!
//! Identity sessions are read from `Authorization: Bearer` or the
//! `__session` cookie and resolved through the [`IdentityProvider`]. Admin
//! tokens are read from the `admin-token` cookie or `Authorization: Bearer`
//! and looked up by digest in the store.

use axum::{
  extract::{FromRequest, FromRequestParts},
  http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use thesis_core::{
  admin::AdminSession, bridge, identity::Identity, identity::IdentityProvider,
  store::ThesisStore,
};

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "__session";
pub const ADMIN_COOKIE: &str = "admin-token";

/// The value of cookie `name`, if the request carries it.
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v)
    .filter(|v| !v.is_empty())
}

pub fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

/// Lower-case hex SHA-256 of an admin token, the form sessions are stored in.
pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// A JSON request body. Malformed, mistyped or missing bodies are rejected
/// as 400 with the usual `{"error": ...}` shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

// ─── Identity ────────────────────────────────────────────────────────────────

/// The provider-verified identity of the caller. Rejects with 401.
pub struct CurrentIdentity(pub Identity);

async fn resolve_identity<S, P>(
  headers: &HeaderMap,
  state: &AppState<S, P>,
) -> Result<Option<Identity>, ApiError>
where
  P: IdentityProvider,
{
  let Some(token) = bearer(headers).or_else(|| cookie(headers, SESSION_COOKIE)) else {
    return Ok(None);
  };
  state
    .identity
    .verify_session(token.to_owned())
    .await
    .map_err(|e| ApiError::Identity(Box::new(e)))
}

impl<S, P> FromRequestParts<AppState<S, P>> for CurrentIdentity
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, P>,
  ) -> Result<Self, Self::Rejection> {
    resolve_identity(&parts.headers, state)
      .await?
      .map(CurrentIdentity)
      .ok_or(ApiError::Unauthenticated)
  }
}

// ─── Admin ───────────────────────────────────────────────────────────────────

/// A live admin session established through `POST /admin/login`.
pub struct AdminToken(pub AdminSession);

async fn resolve_admin<S, P>(
  headers: &HeaderMap,
  state: &AppState<S, P>,
) -> Result<Option<AdminSession>, ApiError>
where
  S: ThesisStore,
{
  let Some(token) = cookie(headers, ADMIN_COOKIE).or_else(|| bearer(headers)) else {
    return Ok(None);
  };
  let session = state
    .store
    .get_admin_session(token_digest(token))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(session.filter(|s| !s.is_expired(Utc::now())))
}

impl<S, P> FromRequestParts<AppState<S, P>> for AdminToken
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, P>,
  ) -> Result<Self, Self::Rejection> {
    resolve_admin(&parts.headers, state)
      .await?
      .map(AdminToken)
      .ok_or(ApiError::Unauthenticated)
  }
}

/// Either an admin session or an identity whose effective role is
/// superuser. Holds the caller's email.
pub struct Superuser {
  pub email: String,
}

impl<S, P> FromRequestParts<AppState<S, P>> for Superuser
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, P>,
  ) -> Result<Self, Self::Rejection> {
    if let Some(session) = resolve_admin(&parts.headers, state).await? {
      return Ok(Superuser { email: session.email });
    }
    let identity = resolve_identity(&parts.headers, state)
      .await?
      .ok_or(ApiError::Unauthenticated)?;
    if bridge::is_superuser(state.store.as_ref(), &identity).await? {
      Ok(Superuser { email: identity.primary_email().to_owned() })
    } else {
      Err(ApiError::Forbidden("superuser access required".into()))
    }
  }
}
