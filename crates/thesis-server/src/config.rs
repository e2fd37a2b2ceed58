//! Runtime configuration, deserialised from `config.toml` and `THESIS__*`
//! environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thesis_api::{AdminConfig, admin::MAX_TOKEN_TTL_HOURS};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("admin_token_ttl_hours must be between 1 and {MAX_TOKEN_TTL_HOURS}, got {0}")]
  TokenTtl(i64),
}

fn default_token_ttl_hours() -> i64 { 24 }

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                    String,
  pub port:                    u16,
  pub store_path:              PathBuf,
  pub superuser_email:         String,
  /// PHC string produced by argon2; see `--hash-password`.
  pub superuser_password_hash: String,
  #[serde(default = "default_token_ttl_hours")]
  pub admin_token_ttl_hours:   i64,
  pub identity:                IdentityConfig,
}

/// Where the external identity provider lives and how to authenticate to it.
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
  pub api_url:    String,
  pub secret_key: String,
}

impl ServerConfig {
  /// Reject values that deserialise fine but cannot be served.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.admin_token_ttl_hours) {
      return Err(ConfigError::TokenTtl(self.admin_token_ttl_hours));
    }
    Ok(())
  }

  pub fn admin(&self) -> AdminConfig {
    AdminConfig {
      email:           self.superuser_email.clone(),
      password_hash:   self.superuser_password_hash.clone(),
      token_ttl_hours: self.admin_token_ttl_hours,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
