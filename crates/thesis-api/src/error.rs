//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthenticated")]
  Unauthenticated,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("identity provider error: {0}")]
  Identity(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<thesis_core::Error> for ApiError {
  fn from(e: thesis_core::Error) -> Self {
    use thesis_core::Error as E;
    match e {
      E::Unauthenticated => Self::Unauthenticated,
      E::Forbidden(m) => Self::Forbidden(m),
      E::Validation(m) => Self::BadRequest(m),
      E::NotFound(m) => Self::NotFound(m),
      E::Conflict(m) => Self::Conflict(m),
      E::Store(e) => Self::Store(e),
      E::Identity(e) => Self::Identity(e),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated".to_owned()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(_) | ApiError::Identity(_) => {
        error!(error = %self, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "internal server error".to_owned(),
        )
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
