//! Error types for `thesis-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// No valid identity accompanied a request to a protected operation.
  #[error("unauthenticated")]
  Unauthenticated,

  #[error("forbidden: {0}")]
  Forbidden(String),

  /// A required field was missing or out of range. The message is shown to
  /// the caller verbatim.
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  NotFound(String),

  /// The write conflicts with the current state of the record, e.g. a review
  /// of a proposal that is no longer pending.
  #[error("{0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("identity provider error: {0}")]
  Identity(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error from a [`crate::store::ThesisStore`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Wrap an error from a [`crate::identity::IdentityProvider`].
  pub fn identity<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Identity(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
