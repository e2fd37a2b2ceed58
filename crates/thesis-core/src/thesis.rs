//! Thesis versions: the ordered artifact list per student.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One uploaded revision. At most one version per student has `is_final`
/// set; stores clear the previous flag in the same write that sets a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThesisVersion {
  pub version_id:     Uuid,
  pub student_id:     String,
  /// 1-based, assigned by the store.
  pub version_number: u32,
  pub title:          String,
  pub notes:          Option<String>,
  pub file_url:       String,
  pub is_final:       bool,
  pub uploaded_at:    DateTime<Utc>,
}

/// Input to [`crate::store::ThesisStore::create_thesis_version`].
#[derive(Debug, Clone)]
pub struct NewThesisVersion {
  pub student_id: String,
  pub title:      String,
  pub notes:      Option<String>,
  pub file_url:   String,
  pub is_final:   bool,
}
