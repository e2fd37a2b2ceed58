//! System settings administered by the superuser.
//!
//! Settings live in process memory only; a restart returns to the defaults.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
  pub general:  GeneralSettings,
  pub email:    EmailSettings,
  pub security: SecuritySettings,
  pub backup:   BackupSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
  pub system_name:                String,
  pub institution_name:           String,
  pub contact_email:              String,
  pub maintenance_mode:           bool,
  pub allow_student_registration: bool,
}

impl Default for GeneralSettings {
  fn default() -> Self {
    Self {
      system_name:                "Thesis Management System".into(),
      institution_name:           "University Name".into(),
      contact_email:              "admin@university.edu".into(),
      maintenance_mode:           false,
      allow_student_registration: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
  pub smtp_host:            String,
  pub smtp_port:            u16,
  pub smtp_user:            String,
  /// Write-only: accepted on update, never serialised back out.
  #[serde(skip_serializing)]
  pub smtp_password:        String,
  pub from_email:           String,
  pub enable_notifications: bool,
}

impl Default for EmailSettings {
  fn default() -> Self {
    Self {
      smtp_host:            "smtp.university.edu".into(),
      smtp_port:            587,
      smtp_user:            "system@university.edu".into(),
      smtp_password:        String::new(),
      from_email:           "noreply@university.edu".into(),
      enable_notifications: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
  pub password_min_length:     u32,
  pub require_two_factor:      bool,
  pub session_timeout_minutes: u32,
  pub max_login_attempts:      u32,
}

impl Default for SecuritySettings {
  fn default() -> Self {
    Self {
      password_min_length:     8,
      require_two_factor:      false,
      session_timeout_minutes: 30,
      max_login_attempts:      5,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
  pub auto_backup:      bool,
  pub backup_frequency: String,
  pub retention_days:   u32,
  pub last_backup:      Option<String>,
}

impl Default for BackupSettings {
  fn default() -> Self {
    Self {
      auto_backup:      true,
      backup_frequency: "daily".into(),
      retention_days:   30,
      last_backup:      None,
    }
  }
}

const BACKUP_FREQUENCIES: &[&str] = &["hourly", "daily", "weekly", "monthly"];

fn check_range(field: &str, value: u32, min: u32, max: u32) -> Result<()> {
  if (min..=max).contains(&value) {
    Ok(())
  } else {
    Err(Error::Validation(format!(
      "{field} must be between {min} and {max}"
    )))
  }
}

impl SystemSettings {
  /// Reject values outside the ranges the admin form allows.
  pub fn validate(&self) -> Result<()> {
    if self.general.system_name.trim().is_empty() {
      return Err(Error::Validation("system_name required".into()));
    }
    let s = &self.security;
    check_range("password_min_length", s.password_min_length, 6, 20)?;
    check_range("max_login_attempts", s.max_login_attempts, 3, 10)?;
    check_range("session_timeout_minutes", s.session_timeout_minutes, 15, 480)?;
    check_range("retention_days", self.backup.retention_days, 7, 365)?;
    if !BACKUP_FREQUENCIES.contains(&self.backup.backup_frequency.as_str()) {
      return Err(Error::Validation(format!(
        "backup_frequency must be one of {}",
        BACKUP_FREQUENCIES.join(", ")
      )));
    }
    Ok(())
  }

  /// Check a candidate password against the configured minimum length.
  pub fn check_password(&self, password: &str) -> Result<()> {
    let min = self.security.password_min_length as usize;
    if password.chars().count() < min {
      return Err(Error::Validation(format!(
        "password must be at least {min} characters"
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    SystemSettings::default().validate().unwrap();
  }

  #[test]
  fn out_of_range_values_are_rejected() {
    let mut settings = SystemSettings::default();
    settings.security.session_timeout_minutes = 5;
    let err = settings.validate().unwrap_err();
    assert!(matches!(err, Error::Validation(m) if m.contains("session_timeout")));

    let mut settings = SystemSettings::default();
    settings.backup.backup_frequency = "fortnightly".into();
    assert!(settings.validate().is_err());
  }

  #[test]
  fn smtp_password_is_never_serialised() {
    let mut settings = SystemSettings::default();
    settings.email.smtp_password = "hunter2".into();
    let json = serde_json::to_string(&settings).unwrap();
    assert!(!json.contains("hunter2"));

    let parsed: SystemSettings =
      serde_json::from_str(r#"{"email":{"smtp_password":"s3cret"}}"#).unwrap();
    assert_eq!(parsed.email.smtp_password, "s3cret");
    assert_eq!(parsed.email.smtp_port, 587);
  }

  #[test]
  fn password_length_follows_security_settings() {
    let settings = SystemSettings::default();
    assert!(settings.check_password("short").is_err());
    assert!(settings.check_password("long enough").is_ok());
  }
}
