//! Server-issued sessions for the superuser path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored admin session. Only the SHA-256 digest of the bearer token is
/// kept; the token itself is handed to the client once, at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
  /// Lower-case hex SHA-256 of the token.
  pub token_digest: String,
  pub email:        String,
  pub issued_at:    DateTime<Utc>,
  pub expires_at:   DateTime<Utc>,
}

impl AdminSession {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}
