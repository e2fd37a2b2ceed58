//! Handlers for `/admin` endpoints.
//!
//! The superuser signs in with the email and argon2 hash from the server
//! configuration and receives an opaque token. Only its digest is stored.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/login` | Body: `{"email", "password"}`; sets the `admin-token` cookie |
//! | `GET`  | `/admin/verify` | 200 with the admin user, 401 otherwise |
//! | `POST` | `/admin/users` | Create a supervisor or coordinator account |
//! | `GET`  | `/admin/settings` | SMTP password is never returned |
//! | `PUT`  | `/admin/settings` | Replace after validation |

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  Json,
  extract::State,
  http::header,
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Duration;
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use serde_json::{Value, json};
use thesis_core::{
  admin::AdminSession,
  bridge::{self, ProvisionedAccount, StaffAccount},
  identity::IdentityProvider,
  settings::SystemSettings,
  store::{ThesisStore, timestamp},
};
use tracing::{info, warn};

use crate::{
  AppState,
  error::ApiError,
  extract::{ADMIN_COOKIE, AdminToken, JsonBody, Superuser, token_digest},
};

/// Upper bound on an admin token's lifetime: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Superuser credentials loaded from the server configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
  pub email:           String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash:   String,
  pub token_ttl_hours: i64,
}

impl AdminConfig {
  /// Whether `email` and `password` match the configured superuser.
  pub fn check(&self, email: &str, password: &str) -> bool {
    if !email.trim().eq_ignore_ascii_case(self.email.trim()) {
      return false;
    }
    let Ok(parsed) = PasswordHash::new(&self.password_hash) else {
      return false;
    };
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  }

  /// Token lifetime, held to 1..=[`MAX_TOKEN_TTL_HOURS`] hours.
  pub fn token_ttl(&self) -> Duration {
    Duration::hours(self.token_ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS))
  }
}

fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

/// `POST /admin/login`
pub async fn login<S, P>(
  State(state): State<AppState<S, P>>,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  if body.email.trim().is_empty() || body.password.is_empty() {
    return Err(ApiError::BadRequest("email and password required".into()));
  }
  if !state.admin.check(&body.email, &body.password) {
    warn!(email = %body.email.trim(), "failed admin login");
    return Err(ApiError::Unauthenticated);
  }

  let token = new_token();
  let issued_at = timestamp();
  let ttl = state.admin.token_ttl();
  let session = AdminSession {
    token_digest: token_digest(&token),
    email: state.admin.email.clone(),
    issued_at,
    expires_at: issued_at + ttl,
  };
  let expires_at = session.expires_at;
  state
    .store
    .create_admin_session(session)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  info!(email = %state.admin.email, "admin signed in");

  let cookie = format!(
    "{ADMIN_COOKIE}={token}; HttpOnly; Path=/; SameSite=Strict; Max-Age={}",
    ttl.num_seconds()
  );
  Ok((
    [(header::SET_COOKIE, cookie)],
    Json(json!({ "ok": true, "token": token, "expires_at": expires_at })),
  ))
}

/// `GET /admin/verify`
pub async fn verify<S, P>(
  State(_): State<AppState<S, P>>,
  AdminToken(session): AdminToken,
) -> Json<Value>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Json(json!({
    "ok": true,
    "user": { "email": session.email, "role": "superuser" },
  }))
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// `POST /admin/users`
pub async fn create_user<S, P>(
  State(state): State<AppState<S, P>>,
  admin: Superuser,
  JsonBody(body): JsonBody<StaffAccount>,
) -> Result<Json<ProvisionedAccount>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  let settings = state.settings.read().await.clone();
  let account = bridge::provision_staff(
    state.store.as_ref(),
    state.identity.as_ref(),
    &settings,
    body,
  )
  .await?;
  info!(by = %admin.email, user = %account.user.user_id, "admin created account");
  Ok(Json(account))
}

// ─── Settings ────────────────────────────────────────────────────────────────

/// `GET /admin/settings`
pub async fn get_settings<S, P>(
  State(state): State<AppState<S, P>>,
  _admin: Superuser,
) -> Json<SystemSettings>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Json(state.settings.read().await.clone())
}

/// `PUT /admin/settings`: an empty `smtp_password` keeps the current one.
pub async fn put_settings<S, P>(
  State(state): State<AppState<S, P>>,
  admin: Superuser,
  JsonBody(mut incoming): JsonBody<SystemSettings>,
) -> Result<Json<SystemSettings>, ApiError>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  incoming.validate()?;
  let mut settings = state.settings.write().await;
  if incoming.email.smtp_password.is_empty() {
    incoming.email.smtp_password = settings.email.smtp_password.clone();
  }
  *settings = incoming;
  info!(by = %admin.email, "system settings updated");
  Ok(Json(settings.clone()))
}
