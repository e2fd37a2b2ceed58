//! JSON REST API for the thesis service.
//!
//! Exposes an axum [`Router`] backed by any [`ThesisStore`] and
//! [`IdentityProvider`]. TLS and transport concerns are the caller's
//! responsibility.

pub mod admin;
pub mod auth;
pub mod comments;
pub mod error;
pub mod extract;
pub mod notifications;
pub mod profiles;
pub mod proposals;
pub mod versions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use thesis_core::{
  identity::IdentityProvider, settings::SystemSettings, store::ThesisStore,
};
use tokio::sync::RwLock;

pub use admin::AdminConfig;
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, P> {
  pub store:    Arc<S>,
  pub identity: Arc<P>,
  pub admin:    Arc<AdminConfig>,
  /// Held in memory only; a restart returns to the defaults.
  pub settings: Arc<RwLock<SystemSettings>>,
}

impl<S, P> AppState<S, P> {
  pub fn new(store: S, identity: P, admin: AdminConfig) -> Self {
    Self {
      store:    Arc::new(store),
      identity: Arc::new(identity),
      admin:    Arc::new(admin),
      settings: Arc::new(RwLock::new(SystemSettings::default())),
    }
  }
}

// Derived `Clone` would demand `S: Clone` and `P: Clone`.
impl<S, P> Clone for AppState<S, P> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      identity: Arc::clone(&self.identity),
      admin:    Arc::clone(&self.admin),
      settings: Arc::clone(&self.settings),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, P>(state: AppState<S, P>) -> Router<()>
where
  S: ThesisStore + 'static,
  P: IdentityProvider + 'static,
{
  Router::new()
    // Identity
    .route("/auth/bootstrap", post(auth::bootstrap::<S, P>))
    .route("/auth/me", get(auth::me::<S, P>))
    .route("/auth/register", post(auth::register::<S, P>))
    // Proposals
    .route(
      "/proposals",
      get(proposals::list::<S, P>).post(proposals::submit::<S, P>),
    )
    .route(
      "/proposals/{id}",
      get(proposals::get_one::<S, P>).patch(proposals::update::<S, P>),
    )
    .route("/proposals/{id}/assignments", get(proposals::assignments::<S, P>))
    // Profiles
    .route("/profile/student", get(profiles::my_student_profile::<S, P>))
    .route("/students/{id}", get(profiles::student::<S, P>))
    .route("/supervisors", get(profiles::supervisors::<S, P>))
    .route("/supervisors/{id}", get(profiles::supervisor::<S, P>))
    .route("/supervisors/{id}/students", get(profiles::supervisor_students::<S, P>))
    // Notifications
    .route("/notifications", get(notifications::feed::<S, P>))
    .route("/notifications/{id}/read", post(notifications::read::<S, P>))
    .route("/notifications/{id}/resolve", post(notifications::resolve::<S, P>))
    // Comments
    .route(
      "/comments",
      get(comments::list::<S, P>).post(comments::create::<S, P>),
    )
    .route("/comments/{id}/resolve", post(comments::resolve::<S, P>))
    .route("/comments/{id}/approve", post(comments::approve::<S, P>))
    // Thesis versions
    .route(
      "/thesis/versions",
      get(versions::list::<S, P>).post(versions::upload::<S, P>),
    )
    .route("/thesis/versions/{id}/final", post(versions::mark_final::<S, P>))
    // Admin
    .route("/admin/login", post(admin::login::<S, P>))
    .route("/admin/verify", get(admin::verify::<S, P>))
    .route("/admin/users", post(admin::create_user::<S, P>))
    .route(
      "/admin/settings",
      get(admin::get_settings::<S, P>).put(admin::put_settings::<S, P>),
    )
    .with_state(state)
}
