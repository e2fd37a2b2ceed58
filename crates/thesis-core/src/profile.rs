//! Role-specific profiles keyed by user id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StudentStatus {
  #[default]
  Current,
  Ended,
}

/// Owned 1:1 by a user with [`Role::Student`](crate::user::Role::Student).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
  pub user_id:          String,
  /// User id of the allocated supervisor. A weak reference: nothing
  /// guarantees the supervisor still exists.
  pub supervisor_id:    Option<String>,
  pub research_topic:   Option<String>,
  pub research_summary: Option<String>,
  pub status:           StudentStatus,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl StudentProfile {
  /// A fresh, unallocated profile.
  pub fn new(user_id: String, now: DateTime<Utc>) -> Self {
    Self {
      user_id,
      supervisor_id: None,
      research_topic: None,
      research_summary: None,
      status: StudentStatus::default(),
      created_at: now,
      updated_at: now,
    }
  }
}

// ─── Supervisor ──────────────────────────────────────────────────────────────

/// Owned 1:1 by a user with [`Role::Supervisor`](crate::user::Role::Supervisor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorProfile {
  pub user_id:     String,
  pub name:        String,
  pub school:      String,
  pub department:  String,
  /// Lower-case topic keywords used by [`crate::allocation::allocate`].
  pub specialties: Vec<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::ThesisStore::upsert_supervisor_profile`].
#[derive(Debug, Clone)]
pub struct NewSupervisorProfile {
  pub user_id:     String,
  pub name:        String,
  pub school:      String,
  pub department:  String,
  /// Raw tags; stores apply [`normalize_specialties`] before writing.
  pub specialties: Vec<String>,
}

/// Trim and lower-case each tag, dropping empties and duplicates while
/// keeping the first occurrence's position.
pub fn normalize_specialties<I, T>(tags: I) -> Vec<String>
where
  I: IntoIterator<Item = T>,
  T: AsRef<str>,
{
  let mut out: Vec<String> = Vec::new();
  for tag in tags {
    let tag = tag.as_ref().trim().to_lowercase();
    if !tag.is_empty() && !out.contains(&tag) {
      out.push(tag);
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_lowercases_trims_and_dedupes() {
    let tags = normalize_specialties([
      " Machine Learning ",
      "AI",
      "",
      "machine learning",
      "   ",
      "ai",
      "Healthcare",
    ]);
    assert_eq!(tags, vec!["machine learning", "ai", "healthcare"]);
  }
}
