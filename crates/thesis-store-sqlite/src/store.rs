//! [`SqliteStore`], the SQLite implementation of [`ThesisStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, Row, params, params_from_iter};
use uuid::Uuid;

use thesis_core::{
  admin::AdminSession,
  comment::{Comment, NewComment},
  notification::{NewNotification, Notification},
  profile::{
    NewSupervisorProfile, StudentProfile, SupervisorProfile, normalize_specialties,
  },
  proposal::{
    Assignment, AssignmentOutcome, NewAssignment, NewProposal, Proposal,
    ProposalStatus, ReviewDecision,
  },
  store::{ProposalQuery, ThesisStore, timestamp},
  thesis::{NewThesisVersion, ThesisVersion},
  user::{Role, User, UserUpsert},
};

use crate::{
  Result,
  encode::{
    ADMIN_SESSION_COLUMNS, ASSIGNMENT_COLUMNS, COMMENT_COLUMNS,
    NOTIFICATION_COLUMNS, PROPOSAL_COLUMNS, RawAdminSession, RawAssignment,
    RawComment, RawNotification, RawProposal, RawStudent, RawSupervisor,
    RawUser, RawVersion, STUDENT_COLUMNS, SUPERVISOR_COLUMNS, USER_COLUMNS,
    VERSION_COLUMNS, decode_enum, encode_dt, encode_tags, encode_uuid,
  },
  error::Error,
  schema::SCHEMA,
};

const PENDING: &str = "pending";

type RowMapper<R> = fn(&Row<'_>) -> rusqlite::Result<R>;

/// What the assignment transaction observed, before decoding.
enum RawOutcome {
  Assigned {
    assignment: RawAssignment,
    superseded: Option<RawAssignment>,
  },
  Unchanged,
  AlreadyAssigned(String),
  NotPending(String),
  ProposalNotFound,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A thesis store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_optional<R: Send + 'static>(
    &self,
    sql: String,
    args: Vec<String>,
    map: RowMapper<R>,
  ) -> Result<Option<R>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(&sql, params_from_iter(args), map).optional()?)
        })
        .await?,
    )
  }

  async fn fetch_all<R: Send + 'static>(
    &self,
    sql: String,
    args: Vec<String>,
    map: RowMapper<R>,
  ) -> Result<Vec<R>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(params_from_iter(args), map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  /// Run a one-way flag `update` (bound to `?1 = key`, `?2 = stamp`), then
  /// re-read the row by `key`. A guarded update that changes nothing still
  /// returns the existing record.
  async fn update_then_fetch<R: Send + 'static>(
    &self,
    update: &'static str,
    select: String,
    key: String,
    stamp: String,
    map: RowMapper<R>,
  ) -> Result<Option<R>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          conn.execute(update, params![key, stamp])?;
          Ok(conn.query_row(&select, params![key], map).optional()?)
        })
        .await?,
    )
  }
}

// ─── ThesisStore impl ────────────────────────────────────────────────────────

impl ThesisStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, input: UserUpsert) -> Result<User> {
    let now = encode_dt(timestamp());
    let role = input.role.as_ref().to_owned();

    let raw: RawUser = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, email, first_name, last_name, username, role,
             school, department, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
           ON CONFLICT (user_id) DO UPDATE SET
             email      = excluded.email,
             first_name = excluded.first_name,
             last_name  = excluded.last_name,
             username   = excluded.username,
             school     = excluded.school,
             department = excluded.department,
             updated_at = excluded.updated_at",
          params![
            input.user_id,
            input.email,
            input.first_name,
            input.last_name,
            input.username,
            role,
            input.school,
            input.department,
            now,
          ],
        )?;
        Ok(conn.query_row(
          &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
          params![input.user_id],
          RawUser::from_row,
        )?)
      })
      .await?;

    raw.into_user()
  }

  async fn get_user(&self, user_id: String) -> Result<Option<User>> {
    self
      .fetch_optional(
        format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
        vec![user_id],
        RawUser::from_row,
      )
      .await?
      .map(RawUser::into_user)
      .transpose()
  }

  async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
    let (filter, args) = match role {
      Some(r) => ("WHERE role = ?1", vec![r.as_ref().to_owned()]),
      None => ("", Vec::new()),
    };
    self
      .fetch_all(
        format!("SELECT {USER_COLUMNS} FROM users {filter} ORDER BY rowid"),
        args,
        RawUser::from_row,
      )
      .await?
      .into_iter()
      .map(RawUser::into_user)
      .collect()
  }

  // ── Student profiles ──────────────────────────────────────────────────────

  async fn ensure_student_profile(&self, user_id: String) -> Result<StudentProfile> {
    let now = encode_dt(timestamp());

    let raw: RawStudent = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO student_profiles (user_id, status, created_at, updated_at)
           VALUES (?1, 'current', ?2, ?2)
           ON CONFLICT (user_id) DO NOTHING",
          params![user_id, now],
        )?;
        Ok(conn.query_row(
          &format!("SELECT {STUDENT_COLUMNS} FROM student_profiles WHERE user_id = ?1"),
          params![user_id],
          RawStudent::from_row,
        )?)
      })
      .await?;

    raw.into_profile()
  }

  async fn get_student_profile(&self, user_id: String) -> Result<Option<StudentProfile>> {
    self
      .fetch_optional(
        format!("SELECT {STUDENT_COLUMNS} FROM student_profiles WHERE user_id = ?1"),
        vec![user_id],
        RawStudent::from_row,
      )
      .await?
      .map(RawStudent::into_profile)
      .transpose()
  }

  async fn set_research_topic(
    &self,
    user_id: String,
    topic: String,
    summary: Option<String>,
  ) -> Result<Option<StudentProfile>> {
    let now = encode_dt(timestamp());

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE student_profiles
           SET research_topic = ?2, research_summary = ?3, updated_at = ?4
           WHERE user_id = ?1",
          params![user_id, topic, summary, now],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(Some(conn.query_row(
          &format!("SELECT {STUDENT_COLUMNS} FROM student_profiles WHERE user_id = ?1"),
          params![user_id],
          RawStudent::from_row,
        )?))
      })
      .await?;

    raw.map(RawStudent::into_profile).transpose()
  }

  async fn list_students_by_supervisor(
    &self,
    supervisor_id: String,
  ) -> Result<Vec<StudentProfile>> {
    self
      .fetch_all(
        format!(
          "SELECT {STUDENT_COLUMNS} FROM student_profiles
           WHERE supervisor_id = ?1 ORDER BY rowid"
        ),
        vec![supervisor_id],
        RawStudent::from_row,
      )
      .await?
      .into_iter()
      .map(RawStudent::into_profile)
      .collect()
  }

  // ── Supervisor profiles ───────────────────────────────────────────────────

  async fn upsert_supervisor_profile(
    &self,
    input: NewSupervisorProfile,
  ) -> Result<SupervisorProfile> {
    let now = encode_dt(timestamp());
    let specialties = encode_tags(&normalize_specialties(&input.specialties))?;

    let raw: RawSupervisor = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO supervisor_profiles (
             user_id, name, school, department, specialties, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
           ON CONFLICT (user_id) DO UPDATE SET
             name        = excluded.name,
             school      = excluded.school,
             department  = excluded.department,
             specialties = excluded.specialties,
             updated_at  = excluded.updated_at",
          params![
            input.user_id,
            input.name,
            input.school,
            input.department,
            specialties,
            now,
          ],
        )?;
        Ok(conn.query_row(
          &format!("SELECT {SUPERVISOR_COLUMNS} FROM supervisor_profiles WHERE user_id = ?1"),
          params![input.user_id],
          RawSupervisor::from_row,
        )?)
      })
      .await?;

    raw.into_profile()
  }

  async fn get_supervisor_profile(
    &self,
    user_id: String,
  ) -> Result<Option<SupervisorProfile>> {
    self
      .fetch_optional(
        format!("SELECT {SUPERVISOR_COLUMNS} FROM supervisor_profiles WHERE user_id = ?1"),
        vec![user_id],
        RawSupervisor::from_row,
      )
      .await?
      .map(RawSupervisor::into_profile)
      .transpose()
  }

  async fn list_supervisor_profiles(&self) -> Result<Vec<SupervisorProfile>> {
    self
      .fetch_all(
        format!("SELECT {SUPERVISOR_COLUMNS} FROM supervisor_profiles ORDER BY rowid"),
        Vec::new(),
        RawSupervisor::from_row,
      )
      .await?
      .into_iter()
      .map(RawSupervisor::into_profile)
      .collect()
  }

  // ── Proposals ─────────────────────────────────────────────────────────────

  async fn create_proposal(&self, input: NewProposal) -> Result<Proposal> {
    let proposal = Proposal {
      proposal_id:            Uuid::new_v4(),
      student_id:             input.student_id,
      topic:                  input.topic,
      summary:                input.summary,
      status:                 ProposalStatus::Pending,
      assigned_supervisor_id: None,
      feedback:               None,
      reviewed_by:            None,
      submitted_at:           timestamp(),
      reviewed_at:            None,
    };

    let id_str     = encode_uuid(proposal.proposal_id);
    let student_id = proposal.student_id.clone();
    let topic      = proposal.topic.clone();
    let summary    = proposal.summary.clone();
    let at_str     = encode_dt(proposal.submitted_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO proposals (proposal_id, student_id, topic, summary, status, submitted_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![id_str, student_id, topic, summary, PENDING, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(proposal)
  }

  async fn get_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>> {
    self
      .fetch_optional(
        format!("SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE proposal_id = ?1"),
        vec![encode_uuid(proposal_id)],
        RawProposal::from_row,
      )
      .await?
      .map(RawProposal::into_proposal)
      .transpose()
  }

  async fn list_proposals(&self, query: ProposalQuery) -> Result<Vec<Proposal>> {
    let mut conds: Vec<&'static str> = Vec::new();
    let mut args: Vec<String> = Vec::new();
    if let Some(status) = query.status {
      conds.push("status = ?");
      args.push(status.as_ref().to_owned());
    }
    if let Some(student_id) = query.student_id {
      conds.push("student_id = ?");
      args.push(student_id);
    }
    if query.unassigned_only {
      conds.push("assigned_supervisor_id IS NULL");
    }
    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    self
      .fetch_all(
        format!(
          "SELECT {PROPOSAL_COLUMNS} FROM proposals {where_clause}
           ORDER BY submitted_at DESC, rowid DESC"
        ),
        args,
        RawProposal::from_row,
      )
      .await?
      .into_iter()
      .map(RawProposal::into_proposal)
      .collect()
  }

  async fn record_assignment(&self, input: NewAssignment) -> Result<AssignmentOutcome> {
    let replaces    = input.replaces_existing();
    let proposal_id = encode_uuid(input.proposal_id);
    let new_id      = encode_uuid(Uuid::new_v4());
    let source      = input.source.as_ref().to_owned();
    let now         = encode_dt(timestamp());

    let raw: RawOutcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row: Option<(String, Option<String>, String)> = tx
          .query_row(
            "SELECT status, assigned_supervisor_id, student_id
             FROM proposals WHERE proposal_id = ?1",
            params![proposal_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;
        let Some((status, current, student_id)) = row else {
          return Ok(RawOutcome::ProposalNotFound);
        };
        if status != PENDING {
          return Ok(RawOutcome::NotPending(status));
        }
        match current {
          Some(c) if c == input.supervisor_id => return Ok(RawOutcome::Unchanged),
          Some(c) if !replaces => return Ok(RawOutcome::AlreadyAssigned(c)),
          _ => {}
        }

        let mut superseded = tx
          .query_row(
            &format!(
              "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
               WHERE proposal_id = ?1 AND superseded_at IS NULL"
            ),
            params![proposal_id],
            RawAssignment::from_row,
          )
          .optional()?;
        if let Some(old) = superseded.as_mut() {
          tx.execute(
            "UPDATE assignments SET superseded_at = ?2 WHERE assignment_id = ?1",
            params![old.assignment_id, now],
          )?;
          old.superseded_at = Some(now.clone());
        }

        tx.execute(
          "INSERT INTO assignments (
             assignment_id, proposal_id, supervisor_id, source, assigned_by, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![new_id, proposal_id, input.supervisor_id, source, input.assigned_by, now],
        )?;
        tx.execute(
          "UPDATE proposals SET assigned_supervisor_id = ?2 WHERE proposal_id = ?1",
          params![proposal_id, input.supervisor_id],
        )?;
        tx.execute(
          "UPDATE student_profiles SET supervisor_id = ?2, updated_at = ?3
           WHERE user_id = ?1",
          params![student_id, input.supervisor_id, now],
        )?;
        tx.commit()?;

        Ok(RawOutcome::Assigned {
          assignment: RawAssignment {
            assignment_id: new_id,
            proposal_id,
            supervisor_id: input.supervisor_id,
            source,
            assigned_by: input.assigned_by,
            recorded_at: now,
            superseded_at: None,
          },
          superseded,
        })
      })
      .await?;

    Ok(match raw {
      RawOutcome::Assigned { assignment, superseded } => AssignmentOutcome::Assigned {
        assignment: assignment.into_assignment()?,
        superseded: superseded.map(RawAssignment::into_assignment).transpose()?,
      },
      RawOutcome::Unchanged => AssignmentOutcome::Unchanged,
      RawOutcome::AlreadyAssigned(supervisor_id) => {
        AssignmentOutcome::AlreadyAssigned { supervisor_id }
      }
      RawOutcome::NotPending(status) => {
        AssignmentOutcome::NotPending(decode_enum("proposal status", &status)?)
      }
      RawOutcome::ProposalNotFound => AssignmentOutcome::ProposalNotFound,
    })
  }

  async fn list_assignments(&self, proposal_id: Uuid) -> Result<Vec<Assignment>> {
    self
      .fetch_all(
        format!(
          "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
           WHERE proposal_id = ?1 ORDER BY recorded_at, rowid"
        ),
        vec![encode_uuid(proposal_id)],
        RawAssignment::from_row,
      )
      .await?
      .into_iter()
      .map(RawAssignment::into_assignment)
      .collect()
  }

  async fn record_review(
    &self,
    proposal_id: Uuid,
    decision: ReviewDecision,
  ) -> Result<Option<Proposal>> {
    let id_str = encode_uuid(proposal_id);
    let status = decision.status.as_ref().to_owned();
    let now    = encode_dt(timestamp());

    let raw: Option<RawProposal> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE proposals
           SET status = ?2, feedback = ?3, reviewed_by = ?4, reviewed_at = ?5
           WHERE proposal_id = ?1 AND status = ?6",
          params![id_str, status, decision.feedback, decision.reviewed_by, now, PENDING],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(Some(conn.query_row(
          &format!("SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE proposal_id = ?1"),
          params![id_str],
          RawProposal::from_row,
        )?))
      })
      .await?;

    raw.map(RawProposal::into_proposal).transpose()
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn create_notification(&self, input: NewNotification) -> Result<Notification> {
    let notification = Notification {
      notification_id: Uuid::new_v4(),
      user_id:         input.user_id,
      kind:            input.kind,
      title:           input.title,
      message:         input.message,
      from_user_id:    input.from_user_id,
      comment_id:      input.comment_id,
      is_read:         false,
      is_resolved:     false,
      created_at:      timestamp(),
      read_at:         None,
      resolved_at:     None,
    };

    let id_str       = encode_uuid(notification.notification_id);
    let user_id      = notification.user_id.clone();
    let kind         = notification.kind.as_ref().to_owned();
    let title        = notification.title.clone();
    let message      = notification.message.clone();
    let from_user_id = notification.from_user_id.clone();
    let comment_id   = notification.comment_id.map(encode_uuid);
    let at_str       = encode_dt(notification.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             notification_id, user_id, kind, title, message,
             from_user_id, comment_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          params![id_str, user_id, kind, title, message, from_user_id, comment_id, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(notification)
  }

  async fn get_notification(&self, notification_id: Uuid) -> Result<Option<Notification>> {
    self
      .fetch_optional(
        format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = ?1"
        ),
        vec![encode_uuid(notification_id)],
        RawNotification::from_row,
      )
      .await?
      .map(RawNotification::into_notification)
      .transpose()
  }

  async fn list_notifications(&self, user_id: String) -> Result<Vec<Notification>> {
    self
      .fetch_all(
        format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ),
        vec![user_id],
        RawNotification::from_row,
      )
      .await?
      .into_iter()
      .map(RawNotification::into_notification)
      .collect()
  }

  async fn count_unread_notifications(&self, user_id: String) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
          params![user_id],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count.max(0) as u64)
  }

  async fn mark_notification_read(
    &self,
    notification_id: Uuid,
  ) -> Result<Option<Notification>> {
    self
      .update_then_fetch(
        "UPDATE notifications SET is_read = 1, read_at = ?2
         WHERE notification_id = ?1 AND is_read = 0",
        format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = ?1"
        ),
        encode_uuid(notification_id),
        encode_dt(timestamp()),
        RawNotification::from_row,
      )
      .await?
      .map(RawNotification::into_notification)
      .transpose()
  }

  async fn mark_notification_resolved(
    &self,
    notification_id: Uuid,
  ) -> Result<Option<Notification>> {
    self
      .update_then_fetch(
        "UPDATE notifications SET is_resolved = 1, resolved_at = ?2
         WHERE notification_id = ?1 AND is_resolved = 0",
        format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = ?1"
        ),
        encode_uuid(notification_id),
        encode_dt(timestamp()),
        RawNotification::from_row,
      )
      .await?
      .map(RawNotification::into_notification)
      .transpose()
  }

  async fn resolve_comment_notifications(&self, comment_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(comment_id);
    let now    = encode_dt(timestamp());

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications SET is_resolved = 1, resolved_at = ?2
           WHERE comment_id = ?1 AND is_resolved = 0",
          params![id_str, now],
        )?)
      })
      .await?;
    Ok(changed as u64)
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn create_comment(&self, input: NewComment) -> Result<Comment> {
    let comment = Comment {
      comment_id:        Uuid::new_v4(),
      student_id:        input.student_id,
      supervisor_id:     input.supervisor_id,
      thesis_version_id: input.thesis_version_id,
      content:           input.content,
      is_resolved:       false,
      is_approved:       false,
      created_at:        timestamp(),
      resolved_at:       None,
      approved_at:       None,
    };

    let id_str        = encode_uuid(comment.comment_id);
    let student_id    = comment.student_id.clone();
    let supervisor_id = comment.supervisor_id.clone();
    let version_id    = comment.thesis_version_id.map(encode_uuid);
    let content       = comment.content.clone();
    let at_str        = encode_dt(comment.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO comments (
             comment_id, student_id, supervisor_id, thesis_version_id, content, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![id_str, student_id, supervisor_id, version_id, content, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(comment)
  }

  async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
    self
      .fetch_optional(
        format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE comment_id = ?1"),
        vec![encode_uuid(comment_id)],
        RawComment::from_row,
      )
      .await?
      .map(RawComment::into_comment)
      .transpose()
  }

  async fn list_comments(&self, student_id: String) -> Result<Vec<Comment>> {
    self
      .fetch_all(
        format!(
          "SELECT {COMMENT_COLUMNS} FROM comments
           WHERE student_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ),
        vec![student_id],
        RawComment::from_row,
      )
      .await?
      .into_iter()
      .map(RawComment::into_comment)
      .collect()
  }

  async fn mark_comment_resolved(&self, comment_id: Uuid) -> Result<Option<Comment>> {
    self
      .update_then_fetch(
        "UPDATE comments SET is_resolved = 1, resolved_at = ?2
         WHERE comment_id = ?1 AND is_resolved = 0",
        format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE comment_id = ?1"),
        encode_uuid(comment_id),
        encode_dt(timestamp()),
        RawComment::from_row,
      )
      .await?
      .map(RawComment::into_comment)
      .transpose()
  }

  async fn mark_comment_approved(&self, comment_id: Uuid) -> Result<Option<Comment>> {
    self
      .update_then_fetch(
        "UPDATE comments SET is_approved = 1, approved_at = ?2
         WHERE comment_id = ?1 AND is_approved = 0",
        format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE comment_id = ?1"),
        encode_uuid(comment_id),
        encode_dt(timestamp()),
        RawComment::from_row,
      )
      .await?
      .map(RawComment::into_comment)
      .transpose()
  }

  // ── Thesis versions ───────────────────────────────────────────────────────

  async fn create_thesis_version(&self, input: NewThesisVersion) -> Result<ThesisVersion> {
    let id_str = encode_uuid(Uuid::new_v4());
    let now    = encode_dt(timestamp());

    let raw: RawVersion = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let latest: u32 = tx.query_row(
          "SELECT COALESCE(MAX(version_number), 0) FROM thesis_versions
           WHERE student_id = ?1",
          params![input.student_id],
          |r| r.get(0),
        )?;
        if input.is_final {
          tx.execute(
            "UPDATE thesis_versions SET is_final = 0 WHERE student_id = ?1",
            params![input.student_id],
          )?;
        }
        let raw = RawVersion {
          version_id:     id_str,
          student_id:     input.student_id,
          version_number: latest + 1,
          title:          input.title,
          notes:          input.notes,
          file_url:       input.file_url,
          is_final:       input.is_final,
          uploaded_at:    now,
        };
        tx.execute(
          "INSERT INTO thesis_versions (
             version_id, student_id, version_number, title, notes,
             file_url, is_final, uploaded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          params![
            raw.version_id,
            raw.student_id,
            raw.version_number,
            raw.title,
            raw.notes,
            raw.file_url,
            raw.is_final,
            raw.uploaded_at,
          ],
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_version()
  }

  async fn get_thesis_version(&self, version_id: Uuid) -> Result<Option<ThesisVersion>> {
    self
      .fetch_optional(
        format!("SELECT {VERSION_COLUMNS} FROM thesis_versions WHERE version_id = ?1"),
        vec![encode_uuid(version_id)],
        RawVersion::from_row,
      )
      .await?
      .map(RawVersion::into_version)
      .transpose()
  }

  async fn list_thesis_versions(&self, student_id: String) -> Result<Vec<ThesisVersion>> {
    self
      .fetch_all(
        format!(
          "SELECT {VERSION_COLUMNS} FROM thesis_versions
           WHERE student_id = ?1 ORDER BY version_number"
        ),
        vec![student_id],
        RawVersion::from_row,
      )
      .await?
      .into_iter()
      .map(RawVersion::into_version)
      .collect()
  }

  async fn mark_final_version(&self, version_id: Uuid) -> Result<Option<ThesisVersion>> {
    let id_str = encode_uuid(version_id);

    let raw: Option<RawVersion> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let student_id: Option<String> = tx
          .query_row(
            "SELECT student_id FROM thesis_versions WHERE version_id = ?1",
            params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(student_id) = student_id else {
          return Ok(None);
        };
        // Clear first so the one-final-per-student index never sees two.
        tx.execute(
          "UPDATE thesis_versions SET is_final = 0 WHERE student_id = ?1",
          params![student_id],
        )?;
        tx.execute(
          "UPDATE thesis_versions SET is_final = 1 WHERE version_id = ?1",
          params![id_str],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {VERSION_COLUMNS} FROM thesis_versions WHERE version_id = ?1"),
          params![id_str],
          RawVersion::from_row,
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawVersion::into_version).transpose()
  }

  // ── Admin sessions ────────────────────────────────────────────────────────

  async fn create_admin_session(&self, session: AdminSession) -> Result<()> {
    let issued  = encode_dt(session.issued_at);
    let expires = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO admin_sessions (token_digest, email, issued_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![session.token_digest, session.email, issued, expires],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_admin_session(&self, token_digest: String) -> Result<Option<AdminSession>> {
    self
      .fetch_optional(
        format!("SELECT {ADMIN_SESSION_COLUMNS} FROM admin_sessions WHERE token_digest = ?1"),
        vec![token_digest],
        RawAdminSession::from_row,
      )
      .await?
      .map(RawAdminSession::into_session)
      .transpose()
  }
}
