//! Per-user notification records.
//!
//! A notification is immutable once created, apart from two one-way flags:
//! `is_read` and `is_resolved`. Setting a flag that is already set leaves the
//! record untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
  Comment,
  Approval,
  Rejection,
  StatusChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  /// The recipient.
  pub user_id:         String,
  pub kind:            NotificationKind,
  pub title:           String,
  pub message:         String,
  pub from_user_id:    Option<String>,
  pub comment_id:      Option<Uuid>,
  pub is_read:         bool,
  pub is_resolved:     bool,
  pub created_at:      DateTime<Utc>,
  pub read_at:         Option<DateTime<Utc>>,
  pub resolved_at:     Option<DateTime<Utc>>,
}

/// Input to [`crate::store::ThesisStore::create_notification`].
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub user_id:      String,
  pub kind:         NotificationKind,
  pub title:        String,
  pub message:      String,
  pub from_user_id: Option<String>,
  pub comment_id:   Option<Uuid>,
}

impl NewNotification {
  pub fn new(
    user_id: impl Into<String>,
    kind: NotificationKind,
    title: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self {
      user_id: user_id.into(),
      kind,
      title: title.into(),
      message: message.into(),
      from_user_id: None,
      comment_id: None,
    }
  }

  pub fn from_user(mut self, user_id: impl Into<String>) -> Self {
    self.from_user_id = Some(user_id.into());
    self
  }

  pub fn about_comment(mut self, comment_id: Uuid) -> Self {
    self.comment_id = Some(comment_id);
    self
  }
}

/// A user's notification feed, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
  pub notifications: Vec<Notification>,
  pub unread:        u64,
}
