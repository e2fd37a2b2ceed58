//! Notification feeds and supervisor comments.

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  comment::{Comment, NewComment},
  identity::Identity,
  notification::{Feed, NewNotification, Notification, NotificationKind},
  store::ThesisStore,
  user::Role,
  workflow::effective_role,
};

// ─── Notifications ───────────────────────────────────────────────────────────

pub async fn feed<S: ThesisStore>(store: &S, identity: &Identity) -> Result<Feed> {
  let notifications = store
    .list_notifications(identity.id.clone())
    .await
    .map_err(Error::store)?;
  let unread = store
    .count_unread_notifications(identity.id.clone())
    .await
    .map_err(Error::store)?;
  Ok(Feed { notifications, unread })
}

/// Fail with `NotFound` unless the notification exists and belongs to the
/// caller.
async fn owned_notification<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  notification_id: Uuid,
) -> Result<()> {
  match store
    .get_notification(notification_id)
    .await
    .map_err(Error::store)?
  {
    Some(n) if n.user_id == identity.id => Ok(()),
    _ => Err(Error::NotFound(format!(
      "notification {notification_id} not found"
    ))),
  }
}

pub async fn mark_read<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  notification_id: Uuid,
) -> Result<Notification> {
  owned_notification(store, identity, notification_id).await?;
  store
    .mark_notification_read(notification_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("notification {notification_id} not found")))
}

pub async fn mark_resolved<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  notification_id: Uuid,
) -> Result<Notification> {
  owned_notification(store, identity, notification_id).await?;
  store
    .mark_notification_resolved(notification_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("notification {notification_id} not found")))
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CommentInput {
  #[serde(default)]
  pub student_id:        String,
  pub thesis_version_id: Option<Uuid>,
  #[serde(default)]
  pub content:           String,
}

/// Leave a comment for a student and notify them of it.
pub async fn add_comment<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  input: CommentInput,
) -> Result<Comment> {
  let content = input.content.trim().to_owned();
  if content.is_empty() {
    return Err(Error::Validation("content required".into()));
  }
  if effective_role(store, identity).await? != Role::Supervisor {
    return Err(Error::Forbidden("only supervisors leave comments".into()));
  }
  let student = store
    .get_student_profile(input.student_id.clone())
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("student {} not found", input.student_id)))?;

  if let Some(version_id) = input.thesis_version_id {
    match store
      .get_thesis_version(version_id)
      .await
      .map_err(Error::store)?
    {
      Some(v) if v.student_id == student.user_id => {}
      _ => return Err(Error::NotFound(format!("thesis version {version_id} not found"))),
    }
  }

  let comment = store
    .create_comment(NewComment {
      student_id: student.user_id.clone(),
      supervisor_id: identity.id.clone(),
      thesis_version_id: input.thesis_version_id,
      content,
    })
    .await
    .map_err(Error::store)?;

  store
    .create_notification(
      NewNotification::new(
        student.user_id,
        NotificationKind::Comment,
        "Supervisor commented on your thesis",
        comment.content.clone(),
      )
      .from_user(identity.id.clone())
      .about_comment(comment.comment_id),
    )
    .await
    .map_err(Error::store)?;

  Ok(comment)
}

/// Comments addressed to `student_id`. Students may only read their own.
pub async fn list_comments<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  student_id: String,
) -> Result<Vec<Comment>> {
  if student_id != identity.id && !effective_role(store, identity).await?.is_staff() {
    return Err(Error::Forbidden("cannot read another student's comments".into()));
  }
  store.list_comments(student_id).await.map_err(Error::store)
}

async fn comment<S: ThesisStore>(store: &S, comment_id: Uuid) -> Result<Comment> {
  store
    .get_comment(comment_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("comment {comment_id} not found")))
}

/// Mark a comment resolved, along with every notification that points at it.
pub async fn resolve_comment<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  comment_id: Uuid,
) -> Result<Comment> {
  if comment(store, comment_id).await?.student_id != identity.id {
    return Err(Error::Forbidden("only the student addressed may resolve".into()));
  }
  let resolved = store
    .mark_comment_resolved(comment_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("comment {comment_id} not found")))?;
  store
    .resolve_comment_notifications(comment_id)
    .await
    .map_err(Error::store)?;
  Ok(resolved)
}

pub async fn approve_comment<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  comment_id: Uuid,
) -> Result<Comment> {
  if comment(store, comment_id).await?.supervisor_id != identity.id {
    return Err(Error::Forbidden("only the author may approve".into()));
  }
  store
    .mark_comment_approved(comment_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("comment {comment_id} not found")))
}
