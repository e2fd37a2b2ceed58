//! Proposals and their supervisor assignments.
//!
//! A proposal moves `pending → approved | rejected` and, independently,
//! `unassigned → assigned`. Assignments are kept as an append-only history:
//! a coordinator override supersedes the current record instead of
//! overwriting it, so at most one assignment per proposal is ever current.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProposalStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

impl ProposalStatus {
  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }

  /// The only defined transitions are out of `pending` into a terminal state.
  pub fn can_transition_to(self, next: Self) -> bool {
    self == Self::Pending && next.is_terminal()
  }
}

// ─── Proposal ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
  pub proposal_id:            Uuid,
  /// User id of the submitting student.
  pub student_id:             String,
  pub topic:                  String,
  pub summary:                Option<String>,
  pub status:                 ProposalStatus,
  /// User id of the currently assigned supervisor.
  pub assigned_supervisor_id: Option<String>,
  pub feedback:               Option<String>,
  pub reviewed_by:            Option<String>,
  pub submitted_at:           DateTime<Utc>,
  pub reviewed_at:            Option<DateTime<Utc>>,
}

impl Proposal {
  pub fn is_assigned(&self) -> bool { self.assigned_supervisor_id.is_some() }
}

/// Input to [`crate::store::ThesisStore::create_proposal`]. New proposals are
/// always `pending` and unassigned.
#[derive(Debug, Clone)]
pub struct NewProposal {
  pub student_id: String,
  pub topic:      String,
  pub summary:    Option<String>,
}

/// A terminal status decision, input to
/// [`crate::store::ThesisStore::record_review`].
#[derive(Debug, Clone)]
pub struct ReviewDecision {
  pub status:      ProposalStatus,
  pub feedback:    Option<String>,
  pub reviewed_by: String,
}

// ─── Assignment ──────────────────────────────────────────────────────────────

/// Which code path produced an assignment.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssignmentSource {
  /// Topic matching at submission time. Never replaces an existing
  /// assignment.
  Auto,
  /// An explicit coordinator decision. Supersedes any current assignment.
  Coordinator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
  pub assignment_id: Uuid,
  pub proposal_id:   Uuid,
  pub supervisor_id: String,
  pub source:        AssignmentSource,
  /// User id of the coordinator; `None` for automatic allocation.
  pub assigned_by:   Option<String>,
  pub recorded_at:   DateTime<Utc>,
  /// Set when a later assignment replaced this one.
  pub superseded_at: Option<DateTime<Utc>>,
}

impl Assignment {
  pub fn is_current(&self) -> bool { self.superseded_at.is_none() }
}

/// Input to [`crate::store::ThesisStore::record_assignment`].
#[derive(Debug, Clone)]
pub struct NewAssignment {
  pub proposal_id:   Uuid,
  pub supervisor_id: String,
  pub source:        AssignmentSource,
  pub assigned_by:   Option<String>,
}

impl NewAssignment {
  /// Whether this write may supersede an existing current assignment.
  pub fn replaces_existing(&self) -> bool {
    self.source == AssignmentSource::Coordinator
  }
}

/// Result of an assignment write. Stores decide the outcome atomically with
/// the write itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
  Assigned {
    assignment: Assignment,
    /// The archived record this one replaced, if any.
    superseded: Option<Assignment>,
  },
  /// The proposal is already assigned to the requested supervisor.
  Unchanged,
  /// An automatic write found the proposal already assigned.
  AlreadyAssigned { supervisor_id: String },
  /// Assignments are only accepted while the proposal is pending.
  NotPending(ProposalStatus),
  ProposalNotFound,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_pending_proposals_can_move() {
    use ProposalStatus::*;
    assert!(Pending.can_transition_to(Approved));
    assert!(Pending.can_transition_to(Rejected));
    assert!(!Pending.can_transition_to(Pending));
    assert!(!Approved.can_transition_to(Rejected));
    assert!(!Rejected.can_transition_to(Approved));
    assert!(!Approved.can_transition_to(Pending));
  }
}
