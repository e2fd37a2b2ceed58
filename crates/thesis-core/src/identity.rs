//! The identity context and the `IdentityProvider` trait.
//!
//! Authentication is delegated to an external provider. Route handlers
//! resolve the caller's session through the provider once per request and
//! pass the resulting [`Identity`] explicitly into every workflow function;
//! nothing reads "the current user" from ambient state.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::user::{Role, UserUpsert};

/// Provider-side metadata attached to an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityMetadata {
  pub role:        Option<Role>,
  pub school:      Option<String>,
  pub department:  Option<String>,
  pub specialties: Vec<String>,
}

/// An authenticated identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:         String,
  /// Addresses in the provider's order; the first is primary.
  #[serde(default)]
  pub emails:     Vec<String>,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub username:   Option<String>,
  #[serde(default)]
  pub metadata:   IdentityMetadata,
}

impl Identity {
  /// The primary email address, or `""` if the provider has none.
  pub fn primary_email(&self) -> &str {
    self.emails.first().map(String::as_str).unwrap_or("")
  }

  /// The role the provider's metadata claims, defaulting to student.
  pub fn claimed_role(&self) -> Role { self.metadata.role.unwrap_or_default() }

  /// Local user record fields derived from this identity.
  pub fn to_user_upsert(&self) -> UserUpsert {
    UserUpsert {
      user_id:    self.id.clone(),
      email:      self.primary_email().to_owned(),
      first_name: self.first_name.clone().unwrap_or_default(),
      last_name:  self.last_name.clone().unwrap_or_default(),
      username:   self.username.clone(),
      role:       self.claimed_role(),
      school:     self.metadata.school.clone(),
      department: self.metadata.department.clone(),
    }
  }
}

/// Input to [`IdentityProvider::create_identity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIdentity {
  pub email:      String,
  pub username:   Option<String>,
  pub password:   String,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub metadata:   IdentityMetadata,
}

/// Abstraction over the external identity/session provider.
pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Resolve a session token presented with a request. Returns `None` for an
  /// unknown or expired session.
  fn verify_session(
    &self,
    token: String,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Create a new identity with the given credentials and metadata.
  fn create_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Whether `error` is the provider refusing the input, e.g. an email that
  /// is already registered. Anything else is treated as the provider failing.
  fn is_rejection(error: &Self::Error) -> bool;
}
