//! Supervisor comments on a student's thesis work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id:        Uuid,
  pub student_id:        String,
  pub supervisor_id:     String,
  /// The version being commented on, when the comment is that specific.
  pub thesis_version_id: Option<Uuid>,
  pub content:           String,
  pub is_resolved:       bool,
  pub is_approved:       bool,
  pub created_at:        DateTime<Utc>,
  pub resolved_at:       Option<DateTime<Utc>>,
  pub approved_at:       Option<DateTime<Utc>>,
}

/// Input to [`crate::store::ThesisStore::create_comment`].
#[derive(Debug, Clone)]
pub struct NewComment {
  pub student_id:        String,
  pub supervisor_id:     String,
  pub thesis_version_id: Option<Uuid>,
  pub content:           String,
}
