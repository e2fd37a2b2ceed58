//! In-memory implementations of [`ThesisStore`] and [`IdentityProvider`].
//!
//! Used by tests across the workspace. Each store keeps its tables behind one
//! lock, so every conditional write observes and changes state atomically.

use std::{
  collections::HashMap,
  sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use thiserror::Error;
use uuid::Uuid;

use crate::{
  admin::AdminSession,
  comment::{Comment, NewComment},
  identity::{Identity, IdentityProvider, NewIdentity},
  notification::{NewNotification, Notification},
  profile::{
    NewSupervisorProfile, StudentProfile, SupervisorProfile,
    normalize_specialties,
  },
  proposal::{
    Assignment, AssignmentOutcome, NewAssignment, NewProposal, Proposal,
    ProposalStatus, ReviewDecision,
  },
  store::{ProposalQuery, ThesisStore, timestamp},
  thesis::{NewThesisVersion, ThesisVersion},
  user::{Role, User, UserUpsert},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("in-memory state lock poisoned")]
  Poisoned,

  #[error("an identity with email {0:?} already exists")]
  DuplicateEmail(String),
}

/// Sort newest-first by `key`, keeping later insertions ahead on ties.
fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
  items.reverse();
  items.sort_by(|a, b| key(b).cmp(&key(a)));
  items
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tables {
  users:          Vec<User>,
  students:       Vec<StudentProfile>,
  supervisors:    Vec<SupervisorProfile>,
  proposals:      Vec<Proposal>,
  assignments:    Vec<Assignment>,
  notifications:  Vec<Notification>,
  comments:       Vec<Comment>,
  versions:       Vec<ThesisVersion>,
  admin_sessions: Vec<AdminSession>,
}

/// A [`ThesisStore`] held entirely in process memory.
///
/// Cloning is cheap and clones share state.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
  tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, MemoryError> {
    self.tables.read().map_err(|_| MemoryError::Poisoned)
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, MemoryError> {
    self.tables.write().map_err(|_| MemoryError::Poisoned)
  }
}

impl ThesisStore for MemoryStore {
  type Error = MemoryError;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, input: UserUpsert) -> Result<User, MemoryError> {
    let mut t = self.write()?;
    let now = timestamp();
    if let Some(user) = t.users.iter_mut().find(|u| u.user_id == input.user_id) {
      user.email = input.email;
      user.first_name = input.first_name;
      user.last_name = input.last_name;
      user.username = input.username;
      user.school = input.school;
      user.department = input.department;
      user.updated_at = now;
      return Ok(user.clone());
    }
    let user = User {
      user_id:    input.user_id,
      email:      input.email,
      first_name: input.first_name,
      last_name:  input.last_name,
      username:   input.username,
      role:       input.role,
      school:     input.school,
      department: input.department,
      created_at: now,
      updated_at: now,
    };
    t.users.push(user.clone());
    Ok(user)
  }

  async fn get_user(&self, user_id: String) -> Result<Option<User>, MemoryError> {
    Ok(self.read()?.users.iter().find(|u| u.user_id == user_id).cloned())
  }

  async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, MemoryError> {
    Ok(
      self
        .read()?
        .users
        .iter()
        .filter(|u| role.is_none_or(|r| u.role == r))
        .cloned()
        .collect(),
    )
  }

  // ── Student profiles ──────────────────────────────────────────────────────

  async fn ensure_student_profile(
    &self,
    user_id: String,
  ) -> Result<StudentProfile, MemoryError> {
    let mut t = self.write()?;
    if let Some(p) = t.students.iter().find(|p| p.user_id == user_id) {
      return Ok(p.clone());
    }
    let profile = StudentProfile::new(user_id, timestamp());
    t.students.push(profile.clone());
    Ok(profile)
  }

  async fn get_student_profile(
    &self,
    user_id: String,
  ) -> Result<Option<StudentProfile>, MemoryError> {
    Ok(self.read()?.students.iter().find(|p| p.user_id == user_id).cloned())
  }

  async fn set_research_topic(
    &self,
    user_id: String,
    topic: String,
    summary: Option<String>,
  ) -> Result<Option<StudentProfile>, MemoryError> {
    let mut t = self.write()?;
    Ok(t.students.iter_mut().find(|p| p.user_id == user_id).map(|p| {
      p.research_topic = Some(topic);
      p.research_summary = summary;
      p.updated_at = timestamp();
      p.clone()
    }))
  }

  async fn list_students_by_supervisor(
    &self,
    supervisor_id: String,
  ) -> Result<Vec<StudentProfile>, MemoryError> {
    Ok(
      self
        .read()?
        .students
        .iter()
        .filter(|p| p.supervisor_id.as_deref() == Some(supervisor_id.as_str()))
        .cloned()
        .collect(),
    )
  }

  // ── Supervisor profiles ───────────────────────────────────────────────────

  async fn upsert_supervisor_profile(
    &self,
    input: NewSupervisorProfile,
  ) -> Result<SupervisorProfile, MemoryError> {
    let mut t = self.write()?;
    let now = timestamp();
    let specialties = normalize_specialties(&input.specialties);
    if let Some(p) = t.supervisors.iter_mut().find(|p| p.user_id == input.user_id) {
      p.name = input.name;
      p.school = input.school;
      p.department = input.department;
      p.specialties = specialties;
      p.updated_at = now;
      return Ok(p.clone());
    }
    let profile = SupervisorProfile {
      user_id: input.user_id,
      name: input.name,
      school: input.school,
      department: input.department,
      specialties,
      created_at: now,
      updated_at: now,
    };
    t.supervisors.push(profile.clone());
    Ok(profile)
  }

  async fn get_supervisor_profile(
    &self,
    user_id: String,
  ) -> Result<Option<SupervisorProfile>, MemoryError> {
    Ok(self.read()?.supervisors.iter().find(|p| p.user_id == user_id).cloned())
  }

  async fn list_supervisor_profiles(
    &self,
  ) -> Result<Vec<SupervisorProfile>, MemoryError> {
    Ok(self.read()?.supervisors.clone())
  }

  // ── Proposals ─────────────────────────────────────────────────────────────

  async fn create_proposal(&self, input: NewProposal) -> Result<Proposal, MemoryError> {
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
    self.write()?.proposals.push(proposal.clone());
    Ok(proposal)
  }

  async fn get_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, MemoryError> {
    Ok(
      self
        .read()?
        .proposals
        .iter()
        .find(|p| p.proposal_id == proposal_id)
        .cloned(),
    )
  }

  async fn list_proposals(
    &self,
    query: ProposalQuery,
  ) -> Result<Vec<Proposal>, MemoryError> {
    let matching: Vec<Proposal> = self
      .read()?
      .proposals
      .iter()
      .filter(|p| query.matches(p))
      .cloned()
      .collect();
    Ok(newest_first(matching, |p| p.submitted_at))
  }

  async fn record_assignment(
    &self,
    input: NewAssignment,
  ) -> Result<AssignmentOutcome, MemoryError> {
    let mut guard = self.write()?;
    let t = &mut *guard;

    let Some(proposal) =
      t.proposals.iter_mut().find(|p| p.proposal_id == input.proposal_id)
    else {
      return Ok(AssignmentOutcome::ProposalNotFound);
    };
    if proposal.status != ProposalStatus::Pending {
      return Ok(AssignmentOutcome::NotPending(proposal.status));
    }
    match proposal.assigned_supervisor_id.as_deref() {
      Some(current) if current == input.supervisor_id => {
        return Ok(AssignmentOutcome::Unchanged);
      }
      Some(current) if !input.replaces_existing() => {
        return Ok(AssignmentOutcome::AlreadyAssigned {
          supervisor_id: current.to_owned(),
        });
      }
      _ => {}
    }

    let now = timestamp();
    let superseded = t
      .assignments
      .iter_mut()
      .find(|a| a.proposal_id == input.proposal_id && a.is_current())
      .map(|a| {
        a.superseded_at = Some(now);
        a.clone()
      });

    let assignment = Assignment {
      assignment_id: Uuid::new_v4(),
      proposal_id:   input.proposal_id,
      supervisor_id: input.supervisor_id,
      source:        input.source,
      assigned_by:   input.assigned_by,
      recorded_at:   now,
      superseded_at: None,
    };
    t.assignments.push(assignment.clone());
    proposal.assigned_supervisor_id = Some(assignment.supervisor_id.clone());

    let student_id = proposal.student_id.clone();
    if let Some(profile) = t.students.iter_mut().find(|p| p.user_id == student_id) {
      profile.supervisor_id = Some(assignment.supervisor_id.clone());
      profile.updated_at = now;
    }

    Ok(AssignmentOutcome::Assigned { assignment, superseded })
  }

  async fn list_assignments(
    &self,
    proposal_id: Uuid,
  ) -> Result<Vec<Assignment>, MemoryError> {
    Ok(
      self
        .read()?
        .assignments
        .iter()
        .filter(|a| a.proposal_id == proposal_id)
        .cloned()
        .collect(),
    )
  }

  async fn record_review(
    &self,
    proposal_id: Uuid,
    decision: ReviewDecision,
  ) -> Result<Option<Proposal>, MemoryError> {
    let mut t = self.write()?;
    Ok(
      t.proposals
        .iter_mut()
        .find(|p| p.proposal_id == proposal_id && p.status == ProposalStatus::Pending)
        .map(|p| {
          p.status = decision.status;
          p.feedback = decision.feedback;
          p.reviewed_by = Some(decision.reviewed_by);
          p.reviewed_at = Some(timestamp());
          p.clone()
        }),
    )
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn create_notification(
    &self,
    input: NewNotification,
  ) -> Result<Notification, MemoryError> {
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
    self.write()?.notifications.push(notification.clone());
    Ok(notification)
  }

  async fn get_notification(
    &self,
    notification_id: Uuid,
  ) -> Result<Option<Notification>, MemoryError> {
    Ok(
      self
        .read()?
        .notifications
        .iter()
        .find(|n| n.notification_id == notification_id)
        .cloned(),
    )
  }

  async fn list_notifications(
    &self,
    user_id: String,
  ) -> Result<Vec<Notification>, MemoryError> {
    let mine: Vec<Notification> = self
      .read()?
      .notifications
      .iter()
      .filter(|n| n.user_id == user_id)
      .cloned()
      .collect();
    Ok(newest_first(mine, |n| n.created_at))
  }

  async fn count_unread_notifications(&self, user_id: String) -> Result<u64, MemoryError> {
    Ok(
      self
        .read()?
        .notifications
        .iter()
        .filter(|n| n.user_id == user_id && !n.is_read)
        .count() as u64,
    )
  }

  async fn mark_notification_read(
    &self,
    notification_id: Uuid,
  ) -> Result<Option<Notification>, MemoryError> {
    let mut t = self.write()?;
    Ok(
      t.notifications
        .iter_mut()
        .find(|n| n.notification_id == notification_id)
        .map(|n| {
          if !n.is_read {
            n.is_read = true;
            n.read_at = Some(timestamp());
          }
          n.clone()
        }),
    )
  }

  async fn mark_notification_resolved(
    &self,
    notification_id: Uuid,
  ) -> Result<Option<Notification>, MemoryError> {
    let mut t = self.write()?;
    Ok(
      t.notifications
        .iter_mut()
        .find(|n| n.notification_id == notification_id)
        .map(|n| {
          if !n.is_resolved {
            n.is_resolved = true;
            n.resolved_at = Some(timestamp());
          }
          n.clone()
        }),
    )
  }

  async fn resolve_comment_notifications(
    &self,
    comment_id: Uuid,
  ) -> Result<u64, MemoryError> {
    let mut t = self.write()?;
    let now = timestamp();
    let mut changed = 0;
    for n in t
      .notifications
      .iter_mut()
      .filter(|n| n.comment_id == Some(comment_id) && !n.is_resolved)
    {
      n.is_resolved = true;
      n.resolved_at = Some(now);
      changed += 1;
    }
    Ok(changed)
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn create_comment(&self, input: NewComment) -> Result<Comment, MemoryError> {
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
    self.write()?.comments.push(comment.clone());
    Ok(comment)
  }

  async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, MemoryError> {
    Ok(
      self
        .read()?
        .comments
        .iter()
        .find(|c| c.comment_id == comment_id)
        .cloned(),
    )
  }

  async fn list_comments(&self, student_id: String) -> Result<Vec<Comment>, MemoryError> {
    let theirs: Vec<Comment> = self
      .read()?
      .comments
      .iter()
      .filter(|c| c.student_id == student_id)
      .cloned()
      .collect();
    Ok(newest_first(theirs, |c| c.created_at))
  }

  async fn mark_comment_resolved(
    &self,
    comment_id: Uuid,
  ) -> Result<Option<Comment>, MemoryError> {
    let mut t = self.write()?;
    Ok(t.comments.iter_mut().find(|c| c.comment_id == comment_id).map(|c| {
      if !c.is_resolved {
        c.is_resolved = true;
        c.resolved_at = Some(timestamp());
      }
      c.clone()
    }))
  }

  async fn mark_comment_approved(
    &self,
    comment_id: Uuid,
  ) -> Result<Option<Comment>, MemoryError> {
    let mut t = self.write()?;
    Ok(t.comments.iter_mut().find(|c| c.comment_id == comment_id).map(|c| {
      if !c.is_approved {
        c.is_approved = true;
        c.approved_at = Some(timestamp());
      }
      c.clone()
    }))
  }

  // ── Thesis versions ───────────────────────────────────────────────────────

  async fn create_thesis_version(
    &self,
    input: NewThesisVersion,
  ) -> Result<ThesisVersion, MemoryError> {
    let mut t = self.write()?;
    let latest = t
      .versions
      .iter()
      .filter(|v| v.student_id == input.student_id)
      .map(|v| v.version_number)
      .max()
      .unwrap_or(0);
    if input.is_final {
      for v in t.versions.iter_mut().filter(|v| v.student_id == input.student_id) {
        v.is_final = false;
      }
    }
    let version = ThesisVersion {
      version_id:     Uuid::new_v4(),
      student_id:     input.student_id,
      version_number: latest + 1,
      title:          input.title,
      notes:          input.notes,
      file_url:       input.file_url,
      is_final:       input.is_final,
      uploaded_at:    timestamp(),
    };
    t.versions.push(version.clone());
    Ok(version)
  }

  async fn get_thesis_version(
    &self,
    version_id: Uuid,
  ) -> Result<Option<ThesisVersion>, MemoryError> {
    Ok(
      self
        .read()?
        .versions
        .iter()
        .find(|v| v.version_id == version_id)
        .cloned(),
    )
  }

  async fn list_thesis_versions(
    &self,
    student_id: String,
  ) -> Result<Vec<ThesisVersion>, MemoryError> {
    let mut theirs: Vec<ThesisVersion> = self
      .read()?
      .versions
      .iter()
      .filter(|v| v.student_id == student_id)
      .cloned()
      .collect();
    theirs.sort_by_key(|v| v.version_number);
    Ok(theirs)
  }

  async fn mark_final_version(
    &self,
    version_id: Uuid,
  ) -> Result<Option<ThesisVersion>, MemoryError> {
    let mut t = self.write()?;
    let Some(student_id) = t
      .versions
      .iter()
      .find(|v| v.version_id == version_id)
      .map(|v| v.student_id.clone())
    else {
      return Ok(None);
    };
    let mut marked = None;
    for v in t.versions.iter_mut().filter(|v| v.student_id == student_id) {
      v.is_final = v.version_id == version_id;
      if v.is_final {
        marked = Some(v.clone());
      }
    }
    Ok(marked)
  }

  // ── Admin sessions ────────────────────────────────────────────────────────

  async fn create_admin_session(&self, session: AdminSession) -> Result<(), MemoryError> {
    self.write()?.admin_sessions.push(session);
    Ok(())
  }

  async fn get_admin_session(
    &self,
    token_digest: String,
  ) -> Result<Option<AdminSession>, MemoryError> {
    Ok(
      self
        .read()?
        .admin_sessions
        .iter()
        .find(|s| s.token_digest == token_digest)
        .cloned(),
    )
  }
}

// ─── Identity provider ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Directory {
  identities: Vec<Identity>,
  sessions:   HashMap<String, String>,
}

/// An [`IdentityProvider`] that keeps identities and sessions in memory.
///
/// Sessions are issued with [`MemoryIdentityProvider::issue_session`].
#[derive(Clone, Debug, Default)]
pub struct MemoryIdentityProvider {
  directory: Arc<RwLock<Directory>>,
}

impl MemoryIdentityProvider {
  pub fn new() -> Self { Self::default() }

  /// Register (or replace) `identity` and return a fresh session token for it.
  pub fn issue_session(&self, identity: Identity) -> Result<String, MemoryError> {
    let mut dir = self.directory.write().map_err(|_| MemoryError::Poisoned)?;
    let token = Uuid::new_v4().simple().to_string();
    dir.sessions.insert(token.clone(), identity.id.clone());
    dir.identities.retain(|i| i.id != identity.id);
    dir.identities.push(identity);
    Ok(token)
  }

  /// Replace a stored identity's profile, as a provider-side edit would.
  pub fn update_identity(&self, identity: Identity) -> Result<(), MemoryError> {
    let mut dir = self.directory.write().map_err(|_| MemoryError::Poisoned)?;
    dir.identities.retain(|i| i.id != identity.id);
    dir.identities.push(identity);
    Ok(())
  }
}

impl IdentityProvider for MemoryIdentityProvider {
  type Error = MemoryError;

  async fn verify_session(&self, token: String) -> Result<Option<Identity>, MemoryError> {
    let dir = self.directory.read().map_err(|_| MemoryError::Poisoned)?;
    Ok(
      dir
        .sessions
        .get(&token)
        .and_then(|id| dir.identities.iter().find(|i| &i.id == id))
        .cloned(),
    )
  }

  async fn create_identity(&self, input: NewIdentity) -> Result<Identity, MemoryError> {
    let mut dir = self.directory.write().map_err(|_| MemoryError::Poisoned)?;
    let email = input.email.to_lowercase();
    if dir
      .identities
      .iter()
      .any(|i| i.emails.iter().any(|e| e.to_lowercase() == email))
    {
      return Err(MemoryError::DuplicateEmail(input.email));
    }
    let identity = Identity {
      id:         format!("user_{}", Uuid::new_v4().simple()),
      emails:     vec![input.email],
      first_name: input.first_name,
      last_name:  input.last_name,
      username:   input.username,
      metadata:   input.metadata,
    };
    dir.identities.push(identity.clone());
    Ok(identity)
  }

  fn is_rejection(error: &MemoryError) -> bool {
    matches!(error, MemoryError::DuplicateEmail(_))
  }
}
