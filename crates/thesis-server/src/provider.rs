//! [`IdentityProvider`] backed by a hosted identity service's JSON API.
//!
//! | Call | Request | Notes |
//! |------|---------|-------|
//! | verify | `POST {api_url}/v1/sessions/verify` `{"token"}` | 401/404 mean no session |
//! | create | `POST {api_url}/v1/users` | Provider user object in, same back |
//!
//! Every request carries the secret key as a bearer token.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thesis_core::identity::{Identity, IdentityMetadata, IdentityProvider, NewIdentity};
use thiserror::Error;

use crate::config::IdentityConfig;

#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("identity provider request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("identity provider rejected the request ({status}): {message}")]
  Rejected { status: StatusCode, message: String },
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct EmailAddress {
  email_address: String,
}

/// A user as the provider represents it.
#[derive(Debug, Serialize, Deserialize)]
struct ProviderUser {
  id:              String,
  #[serde(default)]
  email_addresses: Vec<EmailAddress>,
  first_name:      Option<String>,
  last_name:       Option<String>,
  username:        Option<String>,
  #[serde(default)]
  public_metadata: IdentityMetadata,
}

impl From<ProviderUser> for Identity {
  fn from(u: ProviderUser) -> Self {
    Identity {
      id:         u.id,
      emails:     u.email_addresses.into_iter().map(|e| e.email_address).collect(),
      first_name: u.first_name,
      last_name:  u.last_name,
      username:   u.username,
      metadata:   u.public_metadata,
    }
  }
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
  token: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateUserRequest {
  email_address:   Vec<String>,
  username:        Option<String>,
  password:        String,
  first_name:      Option<String>,
  last_name:       Option<String>,
  public_metadata: IdentityMetadata,
}

impl From<NewIdentity> for CreateUserRequest {
  fn from(n: NewIdentity) -> Self {
    Self {
      email_address:   vec![n.email],
      username:        n.username,
      password:        n.password,
      first_name:      n.first_name,
      last_name:       n.last_name,
      public_metadata: n.metadata,
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpIdentityProvider {
  client: Client,
  config: IdentityConfig,
}

impl HttpIdentityProvider {
  pub fn new(config: IdentityConfig) -> Result<Self, ProviderError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/v1{}", self.config.api_url.trim_end_matches('/'), path)
  }

  /// The provider's `{"error": ...}` or `{"message": ...}` text, else the
  /// raw body.
  async fn rejected(resp: reqwest::Response) -> ProviderError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
      .ok()
      .and_then(|v| {
        ["error", "message"]
          .iter()
          .find_map(|k| v.get(k).and_then(|m| m.as_str()).map(str::to_owned))
      })
      .unwrap_or(body);
    ProviderError::Rejected { status, message }
  }
}

impl IdentityProvider for HttpIdentityProvider {
  type Error = ProviderError;

  async fn verify_session(&self, token: String) -> Result<Option<Identity>, ProviderError> {
    let resp = self
      .client
      .post(self.url("/sessions/verify"))
      .bearer_auth(&self.config.secret_key)
      .json(&VerifyRequest { token: &token })
      .send()
      .await?;

    match resp.status() {
      StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(None),
      s if s.is_success() => Ok(Some(resp.json::<ProviderUser>().await?.into())),
      _ => Err(Self::rejected(resp).await),
    }
  }

  async fn create_identity(&self, input: NewIdentity) -> Result<Identity, ProviderError> {
    let resp = self
      .client
      .post(self.url("/users"))
      .bearer_auth(&self.config.secret_key)
      .json(&CreateUserRequest::from(input))
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Self::rejected(resp).await);
    }
    Ok(resp.json::<ProviderUser>().await?.into())
  }

  /// Only input the provider refused. Transport failures, auth failures
  /// against the provider and 5xx responses are outages.
  fn is_rejection(error: &ProviderError) -> bool {
    matches!(
      error,
      ProviderError::Rejected { status, .. }
        if matches!(
          *status,
          StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
        )
    )
  }
}

#[cfg(test)]
mod tests {
  use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode as AxumStatus},
    routing::post,
  };
  use serde_json::{Value, json};
  use thesis_core::{
    bridge::{self, Registration},
    memory::MemoryStore,
    settings::SystemSettings,
    user::Role,
  };
  use tokio::net::TcpListener;

  use super::*;

  fn authorised(headers: &HeaderMap) -> bool {
    headers
      .get("authorization")
      .and_then(|v| v.to_str().ok())
      .is_some_and(|v| v == "Bearer sk_test")
  }

  async fn verify(headers: HeaderMap, Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
    if !authorised(&headers) {
      return (AxumStatus::FORBIDDEN, Json(json!({ "error": "bad key" })));
    }
    if body["token"] != "good" {
      return (AxumStatus::UNAUTHORIZED, Json(json!({ "error": "no session" })));
    }
    (
      AxumStatus::OK,
      Json(json!({
        "id": "user_1",
        "email_addresses": [{ "email_address": "ada@university.edu" }],
        "first_name": "Ada",
        "last_name": null,
        "username": "ada",
        "public_metadata": { "role": "coordinator" },
      })),
    )
  }

  async fn create(Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
    if body["email_address"][0] == "taken@university.edu" {
      return (AxumStatus::UNPROCESSABLE_ENTITY, Json(json!({ "error": "email taken" })));
    }
    (
      AxumStatus::OK,
      Json(json!({
        "id": "user_2",
        "email_addresses": [{ "email_address": body["email_address"][0] }],
        "first_name": body["first_name"],
        "last_name": body["last_name"],
        "username": body["username"],
        "public_metadata": body["public_metadata"],
      })),
    )
  }

  async fn provider(secret_key: &str) -> HttpIdentityProvider {
    let app = Router::new()
      .route("/v1/sessions/verify", post(verify))
      .route("/v1/users", post(create));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    HttpIdentityProvider::new(IdentityConfig {
      api_url:    format!("http://{addr}/"),
      secret_key: secret_key.into(),
    })
    .unwrap()
  }

  #[tokio::test]
  async fn sessions_resolve_to_identities() {
    let p = provider("sk_test").await;
    let identity = p.verify_session("good".into()).await.unwrap().unwrap();
    assert_eq!(identity.id, "user_1");
    assert_eq!(identity.primary_email(), "ada@university.edu");
    assert_eq!(identity.claimed_role(), Role::Coordinator);

    assert!(p.verify_session("stale".into()).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn a_wrong_secret_key_is_an_error() {
    let p = provider("sk_wrong").await;
    let err = p.verify_session("good".into()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Rejected { status, .. } if status == StatusCode::FORBIDDEN));
  }

  #[tokio::test]
  async fn created_identities_carry_their_metadata() {
    let p = provider("sk_test").await;
    let identity = p
      .create_identity(NewIdentity {
        email:      "new@university.edu".into(),
        username:   Some("newbie".into()),
        password:   "long-enough".into(),
        first_name: Some("New".into()),
        last_name:  None,
        metadata:   IdentityMetadata { role: Some(Role::Student), ..Default::default() },
      })
      .await
      .unwrap();
    assert_eq!(identity.id, "user_2");
    assert_eq!(identity.username.as_deref(), Some("newbie"));
    assert_eq!(identity.claimed_role(), Role::Student);

    let err = p
      .create_identity(NewIdentity {
        email:      "taken@university.edu".into(),
        username:   None,
        password:   "long-enough".into(),
        first_name: None,
        last_name:  None,
        metadata:   IdentityMetadata::default(),
      })
      .await
      .unwrap_err();
    assert!(HttpIdentityProvider::is_rejection(&err));
    let ProviderError::Rejected { message, .. } = err else { panic!("expected a rejection") };
    assert_eq!(message, "email taken");
  }

  #[tokio::test]
  async fn provider_outages_are_not_rejections() {
    let p = provider("sk_wrong").await;
    let err = p.verify_session("good".into()).await.unwrap_err();
    assert!(!HttpIdentityProvider::is_rejection(&err));

    let offline = HttpIdentityProvider::new(IdentityConfig {
      api_url:    "http://127.0.0.1:1".into(),
      secret_key: "sk_test".into(),
    })
    .unwrap();
    let err = offline.verify_session("good".into()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Http(_)));
    assert!(!HttpIdentityProvider::is_rejection(&err));
  }

  #[tokio::test]
  async fn registration_against_an_unreachable_provider_is_an_identity_error() {
    let offline = HttpIdentityProvider::new(IdentityConfig {
      api_url:    "http://127.0.0.1:1".into(),
      secret_key: "sk_test".into(),
    })
    .unwrap();
    let err = bridge::register_student(
      &MemoryStore::new(),
      &offline,
      &SystemSettings::default(),
      Registration {
        email:      "new@university.edu".into(),
        password:   "long-enough".into(),
        username:   None,
        first_name: None,
        last_name:  None,
      },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, thesis_core::Error::Identity(_)));
  }
}
