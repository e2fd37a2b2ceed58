//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with microsecond
//! precision, so lexical order is chronological order. Enums are stored as
//! their lower-case strum names. UUIDs are hyphenated lower-case strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use thesis_core::{
  admin::AdminSession,
  comment::Comment,
  notification::Notification,
  profile::{StudentProfile, SupervisorProfile},
  proposal::{Assignment, Proposal},
  thesis::ThesisVersion,
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::UnknownValue {
    column,
    value: s.to_owned(),
  })
}

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `Raw*` struct holds the column values of one row exactly as read, so
// rows can leave the database thread before any fallible decoding happens.
// The `*_COLUMNS` constants list the columns in `from_row` order.

pub const USER_COLUMNS: &str = "user_id, email, first_name, last_name, username, \
                                role, school, department, created_at, updated_at";

pub struct RawUser {
  pub user_id:    String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub username:   Option<String>,
  pub role:       String,
  pub school:     Option<String>,
  pub department: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      email:      row.get(1)?,
      first_name: row.get(2)?,
      last_name:  row.get(3)?,
      username:   row.get(4)?,
      role:       row.get(5)?,
      school:     row.get(6)?,
      department: row.get(7)?,
      created_at: row.get(8)?,
      updated_at: row.get(9)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    self.user_id,
      email:      self.email,
      first_name: self.first_name,
      last_name:  self.last_name,
      username:   self.username,
      role:       decode_enum("role", &self.role)?,
      school:     self.school,
      department: self.department,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const STUDENT_COLUMNS: &str = "user_id, supervisor_id, research_topic, \
                                   research_summary, status, created_at, updated_at";

pub struct RawStudent {
  pub user_id:          String,
  pub supervisor_id:    Option<String>,
  pub research_topic:   Option<String>,
  pub research_summary: Option<String>,
  pub status:           String,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawStudent {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:          row.get(0)?,
      supervisor_id:    row.get(1)?,
      research_topic:   row.get(2)?,
      research_summary: row.get(3)?,
      status:           row.get(4)?,
      created_at:       row.get(5)?,
      updated_at:       row.get(6)?,
    })
  }

  pub fn into_profile(self) -> Result<StudentProfile> {
    Ok(StudentProfile {
      user_id:          self.user_id,
      supervisor_id:    self.supervisor_id,
      research_topic:   self.research_topic,
      research_summary: self.research_summary,
      status:           decode_enum("student status", &self.status)?,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

pub const SUPERVISOR_COLUMNS: &str =
  "user_id, name, school, department, specialties, created_at, updated_at";

pub struct RawSupervisor {
  pub user_id:     String,
  pub name:        String,
  pub school:      String,
  pub department:  String,
  pub specialties: String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawSupervisor {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:     row.get(0)?,
      name:        row.get(1)?,
      school:      row.get(2)?,
      department:  row.get(3)?,
      specialties: row.get(4)?,
      created_at:  row.get(5)?,
      updated_at:  row.get(6)?,
    })
  }

  pub fn into_profile(self) -> Result<SupervisorProfile> {
    Ok(SupervisorProfile {
      user_id:     self.user_id,
      name:        self.name,
      school:      self.school,
      department:  self.department,
      specialties: decode_tags(&self.specialties)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const PROPOSAL_COLUMNS: &str = "proposal_id, student_id, topic, summary, status, \
                                    assigned_supervisor_id, feedback, reviewed_by, \
                                    submitted_at, reviewed_at";

pub struct RawProposal {
  pub proposal_id:            String,
  pub student_id:             String,
  pub topic:                  String,
  pub summary:                Option<String>,
  pub status:                 String,
  pub assigned_supervisor_id: Option<String>,
  pub feedback:               Option<String>,
  pub reviewed_by:            Option<String>,
  pub submitted_at:           String,
  pub reviewed_at:            Option<String>,
}

impl RawProposal {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      proposal_id:            row.get(0)?,
      student_id:             row.get(1)?,
      topic:                  row.get(2)?,
      summary:                row.get(3)?,
      status:                 row.get(4)?,
      assigned_supervisor_id: row.get(5)?,
      feedback:               row.get(6)?,
      reviewed_by:            row.get(7)?,
      submitted_at:           row.get(8)?,
      reviewed_at:            row.get(9)?,
    })
  }

  pub fn into_proposal(self) -> Result<Proposal> {
    Ok(Proposal {
      proposal_id:            decode_uuid(&self.proposal_id)?,
      student_id:             self.student_id,
      topic:                  self.topic,
      summary:                self.summary,
      status:                 decode_enum("proposal status", &self.status)?,
      assigned_supervisor_id: self.assigned_supervisor_id,
      feedback:               self.feedback,
      reviewed_by:            self.reviewed_by,
      submitted_at:           decode_dt(&self.submitted_at)?,
      reviewed_at:            decode_opt_dt(self.reviewed_at)?,
    })
  }
}

pub const ASSIGNMENT_COLUMNS: &str = "assignment_id, proposal_id, supervisor_id, \
                                      source, assigned_by, recorded_at, superseded_at";

pub struct RawAssignment {
  pub assignment_id: String,
  pub proposal_id:   String,
  pub supervisor_id: String,
  pub source:        String,
  pub assigned_by:   Option<String>,
  pub recorded_at:   String,
  pub superseded_at: Option<String>,
}

impl RawAssignment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      assignment_id: row.get(0)?,
      proposal_id:   row.get(1)?,
      supervisor_id: row.get(2)?,
      source:        row.get(3)?,
      assigned_by:   row.get(4)?,
      recorded_at:   row.get(5)?,
      superseded_at: row.get(6)?,
    })
  }

  pub fn into_assignment(self) -> Result<Assignment> {
    Ok(Assignment {
      assignment_id: decode_uuid(&self.assignment_id)?,
      proposal_id:   decode_uuid(&self.proposal_id)?,
      supervisor_id: self.supervisor_id,
      source:        decode_enum("assignment source", &self.source)?,
      assigned_by:   self.assigned_by,
      recorded_at:   decode_dt(&self.recorded_at)?,
      superseded_at: decode_opt_dt(self.superseded_at)?,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str = "notification_id, user_id, kind, title, message, \
                                        from_user_id, comment_id, is_read, is_resolved, \
                                        created_at, read_at, resolved_at";

pub struct RawNotification {
  pub notification_id: String,
  pub user_id:         String,
  pub kind:            String,
  pub title:           String,
  pub message:         String,
  pub from_user_id:    Option<String>,
  pub comment_id:      Option<String>,
  pub is_read:         bool,
  pub is_resolved:     bool,
  pub created_at:      String,
  pub read_at:         Option<String>,
  pub resolved_at:     Option<String>,
}

impl RawNotification {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      user_id:         row.get(1)?,
      kind:            row.get(2)?,
      title:           row.get(3)?,
      message:         row.get(4)?,
      from_user_id:    row.get(5)?,
      comment_id:      row.get(6)?,
      is_read:         row.get(7)?,
      is_resolved:     row.get(8)?,
      created_at:      row.get(9)?,
      read_at:         row.get(10)?,
      resolved_at:     row.get(11)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      user_id:         self.user_id,
      kind:            decode_enum("notification kind", &self.kind)?,
      title:           self.title,
      message:         self.message,
      from_user_id:    self.from_user_id,
      comment_id:      decode_opt_uuid(self.comment_id)?,
      is_read:         self.is_read,
      is_resolved:     self.is_resolved,
      created_at:      decode_dt(&self.created_at)?,
      read_at:         decode_opt_dt(self.read_at)?,
      resolved_at:     decode_opt_dt(self.resolved_at)?,
    })
  }
}

pub const COMMENT_COLUMNS: &str = "comment_id, student_id, supervisor_id, \
                                   thesis_version_id, content, is_resolved, \
                                   is_approved, created_at, resolved_at, approved_at";

pub struct RawComment {
  pub comment_id:        String,
  pub student_id:        String,
  pub supervisor_id:     String,
  pub thesis_version_id: Option<String>,
  pub content:           String,
  pub is_resolved:       bool,
  pub is_approved:       bool,
  pub created_at:        String,
  pub resolved_at:       Option<String>,
  pub approved_at:       Option<String>,
}

impl RawComment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id:        row.get(0)?,
      student_id:        row.get(1)?,
      supervisor_id:     row.get(2)?,
      thesis_version_id: row.get(3)?,
      content:           row.get(4)?,
      is_resolved:       row.get(5)?,
      is_approved:       row.get(6)?,
      created_at:        row.get(7)?,
      resolved_at:       row.get(8)?,
      approved_at:       row.get(9)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id:        decode_uuid(&self.comment_id)?,
      student_id:        self.student_id,
      supervisor_id:     self.supervisor_id,
      thesis_version_id: decode_opt_uuid(self.thesis_version_id)?,
      content:           self.content,
      is_resolved:       self.is_resolved,
      is_approved:       self.is_approved,
      created_at:        decode_dt(&self.created_at)?,
      resolved_at:       decode_opt_dt(self.resolved_at)?,
      approved_at:       decode_opt_dt(self.approved_at)?,
    })
  }
}

pub const VERSION_COLUMNS: &str = "version_id, student_id, version_number, title, \
                                   notes, file_url, is_final, uploaded_at";

pub struct RawVersion {
  pub version_id:     String,
  pub student_id:     String,
  pub version_number: u32,
  pub title:          String,
  pub notes:          Option<String>,
  pub file_url:       String,
  pub is_final:       bool,
  pub uploaded_at:    String,
}

impl RawVersion {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id:     row.get(0)?,
      student_id:     row.get(1)?,
      version_number: row.get(2)?,
      title:          row.get(3)?,
      notes:          row.get(4)?,
      file_url:       row.get(5)?,
      is_final:       row.get(6)?,
      uploaded_at:    row.get(7)?,
    })
  }

  pub fn into_version(self) -> Result<ThesisVersion> {
    Ok(ThesisVersion {
      version_id:     decode_uuid(&self.version_id)?,
      student_id:     self.student_id,
      version_number: self.version_number,
      title:          self.title,
      notes:          self.notes,
      file_url:       self.file_url,
      is_final:       self.is_final,
      uploaded_at:    decode_dt(&self.uploaded_at)?,
    })
  }
}

pub const ADMIN_SESSION_COLUMNS: &str = "token_digest, email, issued_at, expires_at";

pub struct RawAdminSession {
  pub token_digest: String,
  pub email:        String,
  pub issued_at:    String,
  pub expires_at:   String,
}

impl RawAdminSession {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      token_digest: row.get(0)?,
      email:        row.get(1)?,
      issued_at:    row.get(2)?,
      expires_at:   row.get(3)?,
    })
  }

  pub fn into_session(self) -> Result<AdminSession> {
    Ok(AdminSession {
      token_digest: self.token_digest,
      email:        self.email,
      issued_at:    decode_dt(&self.issued_at)?,
      expires_at:   decode_dt(&self.expires_at)?,
    })
  }
}
