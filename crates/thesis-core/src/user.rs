//! Users and roles.
//!
//! A user is the local mirror of an identity held by the external identity
//! provider. It is keyed by the provider's id and created on first sign-in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ─── Role ────────────────────────────────────────────────────────────────────

/// The single role a user holds. Fixed when the user record is first created.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  Student,
  Supervisor,
  Coordinator,
  Superuser,
}

impl Role {
  /// Whether this role may set a proposal's status.
  pub fn can_review(self) -> bool {
    matches!(self, Self::Supervisor | Self::Coordinator | Self::Superuser)
  }

  /// Whether this role may assign a supervisor to a proposal.
  pub fn can_allocate(self) -> bool {
    matches!(self, Self::Coordinator | Self::Superuser)
  }

  /// Roles that see every student's records, not only their own.
  pub fn is_staff(self) -> bool { !matches!(self, Self::Student) }
}

/// The landing route for a role's dashboard.
pub fn dashboard_for(role: Role) -> &'static str {
  match role {
    Role::Student => "/student-dashboard",
    Role::Supervisor => "/supervisor-dashboard",
    Role::Coordinator => "/coordinator-dashboard",
    Role::Superuser => "/superuser-dashboard",
  }
}

// ─── User ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  /// The identity provider's id for this user.
  pub user_id:    String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub username:   Option<String>,
  pub role:       Role,
  pub school:     Option<String>,
  pub department: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn display_name(&self) -> String {
    let full = format!("{} {}", self.first_name, self.last_name);
    let full = full.trim();
    if full.is_empty() {
      self.username.clone().unwrap_or_else(|| self.email.clone())
    } else {
      full.to_owned()
    }
  }
}

/// Input to [`crate::store::ThesisStore::upsert_user`].
///
/// On insert every field is applied. On update the stored `role` is kept;
/// the remaining fields are overwritten.
#[derive(Debug, Clone)]
pub struct UserUpsert {
  pub user_id:    String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub username:   Option<String>,
  pub role:       Role,
  pub school:     Option<String>,
  pub department: Option<String>,
}
