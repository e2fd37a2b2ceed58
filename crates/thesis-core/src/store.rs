//! The `ThesisStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (`thesis-store-sqlite`, and
//! [`crate::memory::MemoryStore`] for tests). Workflows and route handlers
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::{
  admin::AdminSession,
  comment::{Comment, NewComment},
  notification::{NewNotification, Notification},
  profile::{NewSupervisorProfile, StudentProfile, SupervisorProfile},
  proposal::{
    Assignment, AssignmentOutcome, NewAssignment, NewProposal, Proposal,
    ProposalStatus, ReviewDecision,
  },
  thesis::{NewThesisVersion, ThesisVersion},
  user::{Role, User, UserUpsert},
};

/// The current time at the precision every backend persists (microseconds),
/// so a record read back compares equal to the one that was written.
pub fn timestamp() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`ThesisStore::list_proposals`].
#[derive(Debug, Clone, Default)]
pub struct ProposalQuery {
  pub status:          Option<ProposalStatus>,
  /// Only proposals without a current supervisor assignment.
  pub unassigned_only: bool,
  pub student_id:      Option<String>,
}

impl ProposalQuery {
  pub fn matches(&self, p: &Proposal) -> bool {
    self.status.is_none_or(|s| p.status == s)
      && (!self.unassigned_only || !p.is_assigned())
      && self.student_id.as_ref().is_none_or(|id| &p.student_id == id)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a thesis store backend.
///
/// Conditional writes (`record_assignment`, `record_review`, the final-version
/// flag) decide their outcome atomically with the write, so two concurrent
/// requests cannot both succeed against the same prior state.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ThesisStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert the user, or update it in place if the id exists. The stored
  /// role is never changed by an update.
  fn upsert_user(
    &self,
    input: UserUpsert,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// List users in creation order, optionally filtered by role.
  fn list_users(
    &self,
    role: Option<Role>,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  // ── Student profiles ──────────────────────────────────────────────────

  /// Return the student's profile, creating an empty one if absent.
  fn ensure_student_profile(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<StudentProfile, Self::Error>> + Send + '_;

  fn get_student_profile(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<Option<StudentProfile>, Self::Error>> + Send + '_;

  /// Record the student's research topic. Returns `None` if no profile exists.
  fn set_research_topic(
    &self,
    user_id: String,
    topic: String,
    summary: Option<String>,
  ) -> impl Future<Output = Result<Option<StudentProfile>, Self::Error>> + Send + '_;

  fn list_students_by_supervisor(
    &self,
    supervisor_id: String,
  ) -> impl Future<Output = Result<Vec<StudentProfile>, Self::Error>> + Send + '_;

  // ── Supervisor profiles ───────────────────────────────────────────────

  /// Insert or replace a supervisor profile. Specialties are normalised with
  /// [`crate::profile::normalize_specialties`]; `created_at` survives a
  /// replace.
  fn upsert_supervisor_profile(
    &self,
    input: NewSupervisorProfile,
  ) -> impl Future<Output = Result<SupervisorProfile, Self::Error>> + Send + '_;

  fn get_supervisor_profile(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<Option<SupervisorProfile>, Self::Error>> + Send + '_;

  /// The allocation roster, in the order profiles were first created.
  fn list_supervisor_profiles(
    &self,
  ) -> impl Future<Output = Result<Vec<SupervisorProfile>, Self::Error>> + Send + '_;

  // ── Proposals ─────────────────────────────────────────────────────────

  /// Persist a new `pending`, unassigned proposal. `submitted_at` is set by
  /// the store.
  fn create_proposal(
    &self,
    input: NewProposal,
  ) -> impl Future<Output = Result<Proposal, Self::Error>> + Send + '_;

  fn get_proposal(
    &self,
    proposal_id: Uuid,
  ) -> impl Future<Output = Result<Option<Proposal>, Self::Error>> + Send + '_;

  /// Proposals matching `query`, newest submission first.
  fn list_proposals(
    &self,
    query: ProposalQuery,
  ) -> impl Future<Output = Result<Vec<Proposal>, Self::Error>> + Send + '_;

  /// Assign a supervisor to a pending proposal and to its student's profile.
  ///
  /// An automatic write only succeeds on an unassigned proposal. A
  /// coordinator write supersedes the current assignment, stamping it with
  /// `superseded_at`.
  fn record_assignment(
    &self,
    input: NewAssignment,
  ) -> impl Future<Output = Result<AssignmentOutcome, Self::Error>> + Send + '_;

  /// Assignment history for a proposal, oldest first.
  fn list_assignments(
    &self,
    proposal_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Assignment>, Self::Error>> + Send + '_;

  /// Apply a terminal status if the proposal is still `pending`. Returns the
  /// updated proposal, or `None` if it is missing or no longer pending.
  fn record_review(
    &self,
    proposal_id: Uuid,
    decision: ReviewDecision,
  ) -> impl Future<Output = Result<Option<Proposal>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn create_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  fn get_notification(
    &self,
    notification_id: Uuid,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// A user's notifications, newest first.
  fn list_notifications(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  fn count_unread_notifications(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Set `is_read`. A no-op if already read. `None` if not found.
  fn mark_notification_read(
    &self,
    notification_id: Uuid,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Set `is_resolved`. A no-op if already resolved. `None` if not found.
  fn mark_notification_resolved(
    &self,
    notification_id: Uuid,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Resolve every unresolved notification linked to `comment_id`; returns
  /// how many changed.
  fn resolve_comment_notifications(
    &self,
    comment_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Comments ──────────────────────────────────────────────────────────

  fn create_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  fn get_comment(
    &self,
    comment_id: Uuid,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// Comments addressed to a student, newest first.
  fn list_comments(
    &self,
    student_id: String,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Set `is_resolved`. A no-op if already resolved. `None` if not found.
  fn mark_comment_resolved(
    &self,
    comment_id: Uuid,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// Set `is_approved`. A no-op if already approved. `None` if not found.
  fn mark_comment_approved(
    &self,
    comment_id: Uuid,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  // ── Thesis versions ───────────────────────────────────────────────────

  /// Persist a version numbered one past the student's latest. If it is
  /// final, the previous final version loses the flag in the same write.
  fn create_thesis_version(
    &self,
    input: NewThesisVersion,
  ) -> impl Future<Output = Result<ThesisVersion, Self::Error>> + Send + '_;

  fn get_thesis_version(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<Option<ThesisVersion>, Self::Error>> + Send + '_;

  /// A student's versions in ascending version-number order.
  fn list_thesis_versions(
    &self,
    student_id: String,
  ) -> impl Future<Output = Result<Vec<ThesisVersion>, Self::Error>> + Send + '_;

  /// Flag a version as final, clearing any other final version of the same
  /// student. `None` if not found.
  fn mark_final_version(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<Option<ThesisVersion>, Self::Error>> + Send + '_;

  // ── Admin sessions ────────────────────────────────────────────────────

  fn create_admin_session(
    &self,
    session: AdminSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_admin_session(
    &self,
    token_digest: String,
  ) -> impl Future<Output = Result<Option<AdminSession>, Self::Error>> + Send + '_;
}
