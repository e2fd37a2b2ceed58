//! The proposal workflow: submission, automatic allocation, coordinator
//! assignment and review.
//!
//! Every function takes the store and the caller's [`Identity`] explicitly.
//! Role checks happen here rather than in the HTTP layer so any front end
//! gets the same rules.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  allocation::{self, Match},
  identity::Identity,
  notification::{NewNotification, NotificationKind},
  profile::StudentProfile,
  proposal::{
    Assignment, AssignmentOutcome, AssignmentSource, NewAssignment, NewProposal,
    Proposal, ProposalStatus, ReviewDecision,
  },
  store::{ProposalQuery, ThesisStore},
  user::Role,
};

/// The caller's role: the local user's stored role if one exists, otherwise
/// the provider metadata's claim, otherwise student.
pub async fn effective_role<S: ThesisStore>(
  store: &S,
  identity: &Identity,
) -> Result<Role> {
  let user = store.get_user(identity.id.clone()).await.map_err(Error::store)?;
  Ok(user.map(|u| u.role).unwrap_or_else(|| identity.claimed_role()))
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitProposal {
  #[serde(default)]
  pub topic:   Option<String>,
  #[serde(default)]
  pub summary: Option<String>,
}

/// The stored proposal, with the allocation outcome alongside its fields.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
  #[serde(flatten)]
  pub proposal:   Proposal,
  /// The automatic allocation result; `None` leaves the proposal for a
  /// coordinator.
  pub allocation: Option<Match>,
}

/// Submit a proposal as the calling student and try to allocate a
/// supervisor for it.
pub async fn submit_proposal<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  input: SubmitProposal,
) -> Result<Submission> {
  let Some(topic) = non_empty(input.topic) else {
    return Err(Error::Validation("topic required".into()));
  };
  if effective_role(store, identity).await? != Role::Student {
    return Err(Error::Forbidden("only students submit proposals".into()));
  }
  let summary = non_empty(input.summary);

  store
    .ensure_student_profile(identity.id.clone())
    .await
    .map_err(Error::store)?;
  store
    .set_research_topic(identity.id.clone(), topic.clone(), summary.clone())
    .await
    .map_err(Error::store)?;

  let mut proposal = store
    .create_proposal(NewProposal {
      student_id: identity.id.clone(),
      topic,
      summary,
    })
    .await
    .map_err(Error::store)?;

  let roster = store.list_supervisor_profiles().await.map_err(Error::store)?;
  let allocation = allocation::allocate(&proposal.topic, &roster);

  match &allocation {
    Some(m) => {
      let outcome = store
        .record_assignment(NewAssignment {
          proposal_id:   proposal.proposal_id,
          supervisor_id: m.supervisor_id.clone(),
          source:        AssignmentSource::Auto,
          assigned_by:   None,
        })
        .await
        .map_err(Error::store)?;
      match outcome {
        AssignmentOutcome::Assigned { assignment, .. } => {
          info!(
            proposal = %proposal.proposal_id,
            supervisor = %assignment.supervisor_id,
            score = m.score,
            "proposal allocated"
          );
          notify_assignment(store, &proposal, &assignment).await?;
          proposal.assigned_supervisor_id = Some(assignment.supervisor_id);
        }
        _ => warn!(
          proposal = %proposal.proposal_id,
          "proposal already assigned; automatic allocation skipped"
        ),
      }
    }
    None => {
      info!(
        proposal = %proposal.proposal_id,
        "no supervisor matched; awaiting coordinator assignment"
      );
    }
  }

  Ok(Submission { proposal, allocation })
}

async fn notify_assignment<S: ThesisStore>(
  store: &S,
  proposal: &Proposal,
  assignment: &Assignment,
) -> Result<()> {
  let student = NewNotification::new(
    proposal.student_id.clone(),
    NotificationKind::StatusChange,
    "Supervisor assigned",
    format!("A supervisor has been assigned to \"{}\".", proposal.topic),
  );
  let supervisor = NewNotification::new(
    assignment.supervisor_id.clone(),
    NotificationKind::StatusChange,
    "New student assigned",
    format!("You have been assigned the proposal \"{}\".", proposal.topic),
  )
  .from_user(proposal.student_id.clone());

  let student = match &assignment.assigned_by {
    Some(by) => student.from_user(by.clone()),
    None => student,
  };
  store.create_notification(student).await.map_err(Error::store)?;
  store.create_notification(supervisor).await.map_err(Error::store)?;
  Ok(())
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Proposals visible to the caller. Students only ever see their own.
pub async fn list_proposals<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  mut query: ProposalQuery,
) -> Result<Vec<Proposal>> {
  if !effective_role(store, identity).await?.is_staff() {
    query.student_id = Some(identity.id.clone());
  }
  store.list_proposals(query).await.map_err(Error::store)
}

async fn visible_proposal<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  proposal_id: Uuid,
) -> Result<Proposal> {
  let not_found = || Error::NotFound(format!("proposal {proposal_id} not found"));
  let proposal = store
    .get_proposal(proposal_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(not_found)?;
  if proposal.student_id != identity.id
    && !effective_role(store, identity).await?.is_staff()
  {
    return Err(not_found());
  }
  Ok(proposal)
}

pub async fn get_proposal<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  proposal_id: Uuid,
) -> Result<Proposal> {
  visible_proposal(store, identity, proposal_id).await
}

/// The assignment history of a proposal, oldest first.
pub async fn assignments<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  proposal_id: Uuid,
) -> Result<Vec<Assignment>> {
  visible_proposal(store, identity, proposal_id).await?;
  store.list_assignments(proposal_id).await.map_err(Error::store)
}

/// A student's profile. Students may only read their own; anyone else sees
/// `NotFound`.
pub async fn student_profile<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  student_id: String,
) -> Result<StudentProfile> {
  let not_found = || Error::NotFound(format!("student {student_id} not found"));
  if student_id != identity.id && !effective_role(store, identity).await?.is_staff() {
    return Err(not_found());
  }
  store
    .get_student_profile(student_id.clone())
    .await
    .map_err(Error::store)?
    .ok_or_else(not_found)
}

/// Student profiles allocated to `supervisor_id`.
pub async fn students_of<S: ThesisStore>(
  store: &S,
  supervisor_id: String,
) -> Result<Vec<StudentProfile>> {
  store
    .list_students_by_supervisor(supervisor_id)
    .await
    .map_err(Error::store)
}

// ─── Updates ─────────────────────────────────────────────────────────────────

/// A partial update to a proposal. Assignment is applied before review.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProposalPatch {
  pub status:                 Option<ProposalStatus>,
  pub feedback:               Option<String>,
  pub assigned_supervisor_id: Option<String>,
}

impl ProposalPatch {
  fn is_empty(&self) -> bool {
    self.status.is_none()
      && self.feedback.is_none()
      && self.assigned_supervisor_id.is_none()
  }
}

/// Apply a coordinator assignment and/or a review to a proposal and return
/// the proposal as stored afterwards.
pub async fn update_proposal<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  proposal_id: Uuid,
  patch: ProposalPatch,
) -> Result<Proposal> {
  if patch.is_empty() {
    return Err(Error::Validation("nothing to update".into()));
  }
  if patch.feedback.is_some() && patch.status.is_none() {
    return Err(Error::Validation("feedback requires a status".into()));
  }

  let role = effective_role(store, identity).await?;
  let supervisor_id = non_empty(patch.assigned_supervisor_id);
  if supervisor_id.is_some() && !role.can_allocate() {
    return Err(Error::Forbidden("only coordinators assign supervisors".into()));
  }
  if patch.status.is_some() && !role.can_review() {
    return Err(Error::Forbidden("not allowed to review proposals".into()));
  }

  let not_found = || Error::NotFound(format!("proposal {proposal_id} not found"));
  let mut proposal = store
    .get_proposal(proposal_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(not_found)?;

  if let Some(supervisor_id) = supervisor_id {
    assign(store, identity, &proposal, supervisor_id).await?;
    proposal = store
      .get_proposal(proposal_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(not_found)?;
  }

  if let Some(status) = patch.status {
    proposal = review(store, identity, role, proposal, status, patch.feedback).await?;
  }

  Ok(proposal)
}

async fn assign<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  proposal: &Proposal,
  supervisor_id: String,
) -> Result<()> {
  if store
    .get_supervisor_profile(supervisor_id.clone())
    .await
    .map_err(Error::store)?
    .is_none()
  {
    return Err(Error::NotFound(format!("supervisor {supervisor_id} not found")));
  }

  let outcome = store
    .record_assignment(NewAssignment {
      proposal_id:   proposal.proposal_id,
      supervisor_id: supervisor_id.clone(),
      source:        AssignmentSource::Coordinator,
      assigned_by:   Some(identity.id.clone()),
    })
    .await
    .map_err(Error::store)?;

  match outcome {
    AssignmentOutcome::Assigned { assignment, superseded } => {
      info!(
        proposal = %proposal.proposal_id,
        supervisor = %assignment.supervisor_id,
        replaced = superseded.as_ref().map(|a| a.supervisor_id.as_str()),
        "coordinator assigned supervisor"
      );
      notify_assignment(store, proposal, &assignment).await
    }
    AssignmentOutcome::Unchanged => Ok(()),
    AssignmentOutcome::NotPending(status) => {
      warn!(proposal = %proposal.proposal_id, %status, "assignment refused");
      Err(Error::Conflict(format!("proposal is already {status}")))
    }
    AssignmentOutcome::AlreadyAssigned { supervisor_id } => Err(Error::Conflict(
      format!("proposal is already assigned to {supervisor_id}"),
    )),
    AssignmentOutcome::ProposalNotFound => Err(Error::NotFound(format!(
      "proposal {} not found",
      proposal.proposal_id
    ))),
  }
}

async fn review<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  role: Role,
  proposal: Proposal,
  status: ProposalStatus,
  feedback: Option<String>,
) -> Result<Proposal> {
  if role == Role::Supervisor
    && proposal.assigned_supervisor_id.as_deref() != Some(identity.id.as_str())
  {
    return Err(Error::Forbidden(
      "supervisors only review proposals assigned to them".into(),
    ));
  }
  if status == proposal.status {
    return Ok(proposal);
  }
  if !proposal.status.can_transition_to(status) {
    warn!(
      proposal = %proposal.proposal_id,
      from = %proposal.status,
      to = %status,
      "review refused"
    );
    return Err(Error::Conflict(format!("proposal is already {}", proposal.status)));
  }

  let feedback = non_empty(feedback);
  let reviewed = store
    .record_review(proposal.proposal_id, ReviewDecision {
      status,
      feedback: feedback.clone(),
      reviewed_by: identity.id.clone(),
    })
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::Conflict("proposal is no longer pending".into()))?;

  info!(proposal = %reviewed.proposal_id, %status, "proposal reviewed");

  let (kind, title) = match status {
    ProposalStatus::Approved => (NotificationKind::Approval, "Proposal approved"),
    _ => (NotificationKind::Rejection, "Proposal rejected"),
  };
  let message = match &feedback {
    Some(f) => format!("\"{}\" was {status}: {f}", reviewed.topic),
    None => format!("\"{}\" was {status}.", reviewed.topic),
  };
  store
    .create_notification(
      NewNotification::new(reviewed.student_id.clone(), kind, title, message)
        .from_user(identity.id.clone()),
    )
    .await
    .map_err(Error::store)?;

  Ok(reviewed)
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::{
    identity::IdentityMetadata, memory::MemoryStore,
    profile::NewSupervisorProfile, user::UserUpsert,
  };

  pub(crate) fn identity(id: &str, role: Role) -> Identity {
    Identity {
      id:         id.into(),
      emails:     vec![format!("{id}@uni.edu")],
      first_name: Some(id.into()),
      last_name:  None,
      username:   None,
      metadata:   IdentityMetadata { role: Some(role), ..Default::default() },
    }
  }

  pub(crate) async fn seed_supervisor(store: &MemoryStore, id: &str, tags: &[&str]) {
    let who = identity(id, Role::Supervisor);
    store.upsert_user(who.to_user_upsert()).await.unwrap();
    store
      .upsert_supervisor_profile(NewSupervisorProfile {
        user_id:     id.into(),
        name:        format!("Dr. {id}"),
        school:      "Computing".into(),
        department:  "CS".into(),
        specialties: tags.iter().map(|t| t.to_string()).collect(),
      })
      .await
      .unwrap();
  }

  async fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    seed_supervisor(&store, "sup-1", &["machine learning", "healthcare"]).await;
    seed_supervisor(&store, "sup-2", &["security"]).await;
    store
  }

  fn submit(topic: &str) -> SubmitProposal {
    SubmitProposal { topic: Some(topic.into()), summary: None }
  }

  #[tokio::test]
  async fn submission_allocates_the_best_match() {
    let store = seeded().await;
    let student = identity("stu", Role::Student);

    let out = submit_proposal(
      &store,
      &student,
      submit("Applying machine learning to healthcare records"),
    )
    .await
    .unwrap();

    assert_eq!(out.allocation.as_ref().map(|m| m.score), Some(2));
    assert_eq!(out.proposal.status, ProposalStatus::Pending);
    assert_eq!(out.proposal.assigned_supervisor_id.as_deref(), Some("sup-1"));

    let profile = store.get_student_profile("stu".into()).await.unwrap().unwrap();
    assert_eq!(profile.supervisor_id.as_deref(), Some("sup-1"));
    assert_eq!(
      profile.research_topic.as_deref(),
      Some("Applying machine learning to healthcare records")
    );
    assert_eq!(store.list_notifications("stu".into()).await.unwrap().len(), 1);
    assert_eq!(store.list_notifications("sup-1".into()).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn unmatched_submission_stays_unassigned() {
    let store = seeded().await;
    let out = submit_proposal(
      &store,
      &identity("stu", Role::Student),
      submit("Quantum cryptography"),
    )
    .await
    .unwrap();
    assert!(out.allocation.is_none());
    assert!(!out.proposal.is_assigned());

    let unassigned = store
      .list_proposals(ProposalQuery { unassigned_only: true, ..Default::default() })
      .await
      .unwrap();
    assert_eq!(unassigned.len(), 1);
  }

  #[tokio::test]
  async fn blank_topic_persists_nothing() {
    let store = seeded().await;
    let err = submit_proposal(&store, &identity("stu", Role::Student), submit("  "))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(m) if m == "topic required"));
    assert!(store.list_proposals(ProposalQuery::default()).await.unwrap().is_empty());
    assert!(store.get_student_profile("stu".into()).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn missing_topic_is_the_same_as_blank() {
    let store = seeded().await;
    let input: SubmitProposal = serde_json::from_str(r#"{"topic": null}"#).unwrap();
    let err = submit_proposal(&store, &identity("stu", Role::Student), input)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(m) if m == "topic required"));
    assert!(store.list_proposals(ProposalQuery::default()).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn non_students_cannot_submit() {
    let store = seeded().await;
    let err = submit_proposal(&store, &identity("sup-1", Role::Supervisor), submit("x"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
  }

  #[tokio::test]
  async fn stored_role_outranks_metadata_claim() {
    let store = MemoryStore::new();
    let upsert: UserUpsert = identity("u", Role::Student).to_user_upsert();
    store.upsert_user(upsert).await.unwrap();

    let claims_coordinator = identity("u", Role::Coordinator);
    assert_eq!(
      effective_role(&store, &claims_coordinator).await.unwrap(),
      Role::Student
    );
    assert_eq!(
      effective_role(&store, &identity("nobody", Role::Coordinator)).await.unwrap(),
      Role::Coordinator
    );
  }

  async fn pending(store: &MemoryStore, topic: &str) -> Proposal {
    submit_proposal(store, &identity("stu", Role::Student), submit(topic))
      .await
      .unwrap()
      .proposal
  }

  #[tokio::test]
  async fn approval_without_assignment_is_allowed() {
    let store = seeded().await;
    let p = pending(&store, "Quantum cryptography").await;
    let coordinator = identity("coord", Role::Coordinator);

    let updated = update_proposal(&store, &coordinator, p.proposal_id, ProposalPatch {
      status: Some(ProposalStatus::Approved),
      ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(updated.status, ProposalStatus::Approved);
    assert!(!updated.is_assigned());
    assert_eq!(updated.reviewed_by.as_deref(), Some("coord"));

    let feed = store.list_notifications("stu".into()).await.unwrap();
    assert_eq!(feed[0].kind, NotificationKind::Approval);
  }

  #[tokio::test]
  async fn terminal_proposals_refuse_further_review() {
    let store = seeded().await;
    let p = pending(&store, "Quantum cryptography").await;
    let coordinator = identity("coord", Role::Coordinator);
    let reject = || ProposalPatch {
      status: Some(ProposalStatus::Rejected),
      ..Default::default()
    };

    update_proposal(&store, &coordinator, p.proposal_id, reject()).await.unwrap();
    let err = update_proposal(&store, &coordinator, p.proposal_id, ProposalPatch {
      status: Some(ProposalStatus::Approved),
      ..Default::default()
    })
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // Repeating the current status changes nothing.
    let again = update_proposal(&store, &coordinator, p.proposal_id, reject())
      .await
      .unwrap();
    assert_eq!(again.status, ProposalStatus::Rejected);
  }

  #[tokio::test]
  async fn coordinator_reassignment_keeps_history_and_status() {
    let store = seeded().await;
    let p = pending(&store, "machine learning").await;
    assert_eq!(p.assigned_supervisor_id.as_deref(), Some("sup-1"));
    let coordinator = identity("coord", Role::Coordinator);

    let updated = update_proposal(&store, &coordinator, p.proposal_id, ProposalPatch {
      assigned_supervisor_id: Some("sup-2".into()),
      ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(updated.assigned_supervisor_id.as_deref(), Some("sup-2"));
    assert_eq!(updated.status, ProposalStatus::Pending);

    let history = assignments(&store, &coordinator, p.proposal_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].source, AssignmentSource::Auto);
    assert!(!history[0].is_current());
    assert_eq!(history[1].assigned_by.as_deref(), Some("coord"));
  }

  #[tokio::test]
  async fn assignment_requires_a_known_supervisor_and_coordinator() {
    let store = seeded().await;
    let p = pending(&store, "Quantum cryptography").await;
    let patch = |id: &str| ProposalPatch {
      assigned_supervisor_id: Some(id.into()),
      ..Default::default()
    };

    let err = update_proposal(
      &store,
      &identity("coord", Role::Coordinator),
      p.proposal_id,
      patch("ghost"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = update_proposal(
      &store,
      &identity("sup-1", Role::Supervisor),
      p.proposal_id,
      patch("sup-1"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
  }

  #[tokio::test]
  async fn supervisors_review_only_their_own_proposals() {
    let store = seeded().await;
    let p = pending(&store, "network security").await;
    let approve = || ProposalPatch {
      status: Some(ProposalStatus::Approved),
      feedback: Some("Looks good".into()),
      ..Default::default()
    };

    let err = update_proposal(&store, &identity("sup-1", Role::Supervisor), p.proposal_id, approve())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let ok = update_proposal(&store, &identity("sup-2", Role::Supervisor), p.proposal_id, approve())
      .await
      .unwrap();
    assert_eq!(ok.feedback.as_deref(), Some("Looks good"));
  }

  #[tokio::test]
  async fn students_see_only_their_proposals() {
    let store = seeded().await;
    let mine = pending(&store, "machine learning").await;
    submit_proposal(&store, &identity("other", Role::Student), submit("security"))
      .await
      .unwrap();

    let seen = list_proposals(&store, &identity("stu", Role::Student), ProposalQuery::default())
      .await
      .unwrap();
    assert_eq!(seen, vec![mine.clone()]);

    let err = get_proposal(&store, &identity("other", Role::Student), mine.proposal_id)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
  }

  #[tokio::test]
  async fn malformed_patches_are_rejected() {
    let store = seeded().await;
    let p = pending(&store, "security").await;
    let coordinator = identity("coord", Role::Coordinator);

    let err = update_proposal(&store, &coordinator, p.proposal_id, ProposalPatch::default())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = update_proposal(&store, &coordinator, p.proposal_id, ProposalPatch {
      feedback: Some("hm".into()),
      ..Default::default()
    })
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = update_proposal(&store, &coordinator, Uuid::new_v4(), ProposalPatch {
      status: Some(ProposalStatus::Approved),
      ..Default::default()
    })
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
  }
}
