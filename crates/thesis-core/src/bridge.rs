//! Mirrors provider identities into local user records.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
  Error, Result,
  identity::{Identity, IdentityMetadata, IdentityProvider, NewIdentity},
  profile::{NewSupervisorProfile, SupervisorProfile},
  settings::SystemSettings,
  store::ThesisStore,
  user::{Role, User, dashboard_for},
  workflow::effective_role,
};

/// Create or refresh the local user for `identity`.
///
/// Profile fields are overwritten on every call; the role is only taken from
/// the identity when the user is first inserted. Students also get an empty
/// profile if they have none.
pub async fn bootstrap<S: ThesisStore>(store: &S, identity: &Identity) -> Result<User> {
  let user = store
    .upsert_user(identity.to_user_upsert())
    .await
    .map_err(Error::store)?;
  if user.role == Role::Student {
    store
      .ensure_student_profile(user.user_id.clone())
      .await
      .map_err(Error::store)?;
  }
  info!(user = %user.user_id, role = %user.role, "bootstrapped user");
  Ok(user)
}

#[derive(Debug, Clone, Serialize)]
pub struct Me {
  pub identity:  Identity,
  pub user:      Option<User>,
  pub role:      Role,
  pub dashboard: &'static str,
}

pub async fn me<S: ThesisStore>(store: &S, identity: &Identity) -> Result<Me> {
  let user = store.get_user(identity.id.clone()).await.map_err(Error::store)?;
  let role = user.as_ref().map(|u| u.role).unwrap_or_else(|| identity.claimed_role());
  Ok(Me {
    identity: identity.clone(),
    user,
    role,
    dashboard: dashboard_for(role),
  })
}

fn check_email(email: &str) -> Result<String> {
  let email = email.trim();
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
      Ok(email.to_owned())
    }
    _ => Err(Error::Validation("a valid email is required".into())),
  }
}

/// Refusals are shown to the caller; provider failures are not.
fn provider_error<P: IdentityProvider>(e: P::Error) -> Error {
  if P::is_rejection(&e) {
    Error::Validation(e.to_string())
  } else {
    Error::identity(e)
  }
}

// ─── Self-service registration ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  #[serde(default)]
  pub email:      String,
  #[serde(default)]
  pub password:   String,
  pub username:   Option<String>,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
}

/// Create a student identity with the provider and bootstrap it locally.
pub async fn register_student<S, P>(
  store: &S,
  provider: &P,
  settings: &SystemSettings,
  input: Registration,
) -> Result<User>
where
  S: ThesisStore,
  P: IdentityProvider,
{
  if !settings.general.allow_student_registration {
    return Err(Error::Forbidden("student registration is disabled".into()));
  }
  let email = check_email(&input.email)?;
  settings.check_password(&input.password)?;

  let identity = provider
    .create_identity(NewIdentity {
      email,
      username: input.username,
      password: input.password,
      first_name: input.first_name,
      last_name: input.last_name,
      metadata: IdentityMetadata { role: Some(Role::Student), ..Default::default() },
    })
    .await
    .map_err(provider_error::<P>)?;

  bootstrap(store, &identity).await
}

// ─── Staff provisioning ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct StaffAccount {
  #[serde(default)]
  pub email:       String,
  #[serde(default)]
  pub username:    String,
  #[serde(default)]
  pub password:    String,
  pub first_name:  Option<String>,
  pub last_name:   Option<String>,
  pub role:        Role,
  pub school:      Option<String>,
  pub department:  Option<String>,
  #[serde(default)]
  pub specialties: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedAccount {
  pub user:               User,
  pub supervisor_profile: Option<SupervisorProfile>,
}

/// Create a supervisor or coordinator account. Supervisors also get a
/// profile so they enter the allocation roster.
pub async fn provision_staff<S, P>(
  store: &S,
  provider: &P,
  settings: &SystemSettings,
  input: StaffAccount,
) -> Result<ProvisionedAccount>
where
  S: ThesisStore,
  P: IdentityProvider,
{
  if !matches!(input.role, Role::Supervisor | Role::Coordinator) {
    return Err(Error::Validation("role must be supervisor or coordinator".into()));
  }
  let email = check_email(&input.email)?;
  let username = input.username.trim().to_owned();
  if username.is_empty() {
    return Err(Error::Validation("username required".into()));
  }
  settings.check_password(&input.password)?;

  let identity = provider
    .create_identity(NewIdentity {
      email,
      username: Some(username),
      password: input.password,
      first_name: input.first_name,
      last_name: input.last_name,
      metadata: IdentityMetadata {
        role:        Some(input.role),
        school:      input.school,
        department:  input.department,
        specialties: input.specialties,
      },
    })
    .await
    .map_err(provider_error::<P>)?;

  let user = store
    .upsert_user(identity.to_user_upsert())
    .await
    .map_err(Error::store)?;

  let supervisor_profile = if user.role == Role::Supervisor {
    let profile = store
      .upsert_supervisor_profile(NewSupervisorProfile {
        user_id:     user.user_id.clone(),
        name:        user.display_name(),
        school:      user.school.clone().unwrap_or_default(),
        department:  user.department.clone().unwrap_or_default(),
        specialties: identity.metadata.specialties.clone(),
      })
      .await
      .map_err(Error::store)?;
    Some(profile)
  } else {
    None
  };

  info!(user = %user.user_id, role = %user.role, "provisioned staff account");
  Ok(ProvisionedAccount { user, supervisor_profile })
}

/// Whether `identity` resolves to a superuser.
pub async fn is_superuser<S: ThesisStore>(store: &S, identity: &Identity) -> Result<bool> {
  Ok(effective_role(store, identity).await? == Role::Superuser)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    memory::{MemoryIdentityProvider, MemoryStore},
    workflow::tests::identity,
  };

  #[tokio::test]
  async fn bootstrap_twice_updates_in_place() {
    let store = MemoryStore::new();
    let mut who = identity("user_1", Role::Student);
    bootstrap(&store, &who).await.unwrap();

    who.emails = vec!["new@uni.edu".into()];
    let user = bootstrap(&store, &who).await.unwrap();

    let users = store.list_users(None).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(user.email, "new@uni.edu");
    assert_eq!(users[0].email, "new@uni.edu");
    assert!(store.get_student_profile("user_1".into()).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn bootstrap_never_changes_the_stored_role() {
    let store = MemoryStore::new();
    bootstrap(&store, &identity("u", Role::Student)).await.unwrap();
    let user = bootstrap(&store, &identity("u", Role::Superuser)).await.unwrap();
    assert_eq!(user.role, Role::Student);
  }

  #[tokio::test]
  async fn staff_get_no_student_profile() {
    let store = MemoryStore::new();
    let user = bootstrap(&store, &identity("c", Role::Coordinator)).await.unwrap();
    assert_eq!(user.role, Role::Coordinator);
    assert!(store.get_student_profile("c".into()).await.unwrap().is_none());

    let whoami = me(&store, &identity("c", Role::Student)).await.unwrap();
    assert_eq!(whoami.role, Role::Coordinator);
    assert_eq!(whoami.dashboard, "/coordinator-dashboard");
  }

  fn registration(email: &str, password: &str) -> Registration {
    Registration {
      email:      email.into(),
      password:   password.into(),
      username:   None,
      first_name: Some("Grace".into()),
      last_name:  Some("Hopper".into()),
    }
  }

  #[tokio::test]
  async fn registration_creates_a_student() {
    let store = MemoryStore::new();
    let provider = MemoryIdentityProvider::new();
    let settings = SystemSettings::default();

    let user = register_student(
      &store,
      &provider,
      &settings,
      registration("grace@uni.edu", "correct horse"),
    )
    .await
    .unwrap();
    assert_eq!(user.role, Role::Student);
    assert!(user.user_id.starts_with("user_"));

    let err = register_student(
      &store,
      &provider,
      &settings,
      registration("grace@uni.edu", "correct horse"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  /// A provider that never answers.
  struct Offline;

  #[derive(Debug, thiserror::Error)]
  #[error("error sending request for url (http://identity.internal/v1/users)")]
  struct ConnectionRefused;

  impl IdentityProvider for Offline {
    type Error = ConnectionRefused;

    async fn verify_session(&self, _: String) -> Result<Option<Identity>, ConnectionRefused> {
      Err(ConnectionRefused)
    }

    async fn create_identity(&self, _: NewIdentity) -> Result<Identity, ConnectionRefused> {
      Err(ConnectionRefused)
    }

    fn is_rejection(_: &ConnectionRefused) -> bool { false }
  }

  fn staff(email: &str, role: Role) -> StaffAccount {
    StaffAccount {
      email:       email.into(),
      username:    "staff".into(),
      password:    "long enough".into(),
      first_name:  None,
      last_name:   None,
      role,
      school:      None,
      department:  None,
      specialties: Vec::new(),
    }
  }

  #[tokio::test]
  async fn an_unreachable_provider_is_not_the_callers_fault() {
    let store = MemoryStore::new();
    let settings = SystemSettings::default();

    let err = register_student(&store, &Offline, &settings, registration("a@b.edu", "long enough"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Identity(_)));

    let err = provision_staff(&store, &Offline, &settings, staff("s@b.edu", Role::Supervisor))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Identity(_)));
    assert!(store.list_users(None).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn a_taken_email_is_a_validation_error_for_staff_too() {
    let store = MemoryStore::new();
    let provider = MemoryIdentityProvider::new();
    let settings = SystemSettings::default();

    provision_staff(&store, &provider, &settings, staff("s@b.edu", Role::Coordinator))
      .await
      .unwrap();
    let err = provision_staff(&store, &provider, &settings, staff("S@b.edu", Role::Coordinator))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn registration_follows_settings() {
    let store = MemoryStore::new();
    let provider = MemoryIdentityProvider::new();
    let mut settings = SystemSettings::default();

    let err = register_student(&store, &provider, &settings, registration("a@b.edu", "short"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(m) if m.contains("at least 8")));

    let err = register_student(&store, &provider, &settings, registration("nope", "long enough"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    settings.general.allow_student_registration = false;
    let err = register_student(&store, &provider, &settings, registration("a@b.edu", "long enough"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
  }

  #[tokio::test]
  async fn provisioned_supervisors_join_the_roster() {
    let store = MemoryStore::new();
    let provider = MemoryIdentityProvider::new();

    let account = provision_staff(&store, &provider, &SystemSettings::default(), StaffAccount {
      email:       "turing@uni.edu".into(),
      username:    "aturing".into(),
      password:    "enigma-machine".into(),
      first_name:  Some("Alan".into()),
      last_name:   Some("Turing".into()),
      role:        Role::Supervisor,
      school:      Some("Computing".into()),
      department:  None,
      specialties: vec![" Machine Learning ".into(), "".into()],
    })
    .await
    .unwrap();

    let profile = account.supervisor_profile.unwrap();
    assert_eq!(profile.name, "Alan Turing");
    assert_eq!(profile.specialties, vec!["machine learning"]);
    assert_eq!(store.list_supervisor_profiles().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn only_supervisors_and_coordinators_are_provisioned() {
    let store = MemoryStore::new();
    let provider = MemoryIdentityProvider::new();
    let err = provision_staff(&store, &provider, &SystemSettings::default(), StaffAccount {
      email:       "x@uni.edu".into(),
      username:    "x".into(),
      password:    "long enough".into(),
      first_name:  None,
      last_name:   None,
      role:        Role::Superuser,
      school:      None,
      department:  None,
      specialties: Vec::new(),
    })
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }
}
