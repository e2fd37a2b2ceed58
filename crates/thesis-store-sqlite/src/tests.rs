//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Duration;
use thesis_core::{
  admin::AdminSession,
  comment::NewComment,
  notification::{NewNotification, NotificationKind},
  profile::NewSupervisorProfile,
  proposal::{
    AssignmentOutcome, AssignmentSource, NewAssignment, NewProposal, ProposalStatus,
    ReviewDecision,
  },
  store::{ProposalQuery, ThesisStore, timestamp},
  thesis::NewThesisVersion,
  user::{Role, UserUpsert},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn user(id: &str, email: &str, role: Role) -> UserUpsert {
  UserUpsert {
    user_id:    id.into(),
    email:      email.into(),
    first_name: "Ada".into(),
    last_name:  "Lovelace".into(),
    username:   None,
    role,
    school:     None,
    department: None,
  }
}

async fn proposal(s: &SqliteStore, student: &str, topic: &str) -> Uuid {
  s.ensure_student_profile(student.into()).await.unwrap();
  s.create_proposal(NewProposal {
    student_id: student.into(),
    topic:      topic.into(),
    summary:    None,
  })
  .await
  .unwrap()
  .proposal_id
}

fn assign(proposal_id: Uuid, sup: &str, source: AssignmentSource) -> NewAssignment {
  NewAssignment {
    proposal_id,
    supervisor_id: sup.into(),
    source,
    assigned_by: (source == AssignmentSource::Coordinator).then(|| "coord".into()),
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_updates_in_place_and_keeps_role() {
  let s = store().await;
  let first = s.upsert_user(user("u1", "old@uni.edu", Role::Student)).await.unwrap();
  let second = s
    .upsert_user(user("u1", "new@uni.edu", Role::Superuser))
    .await
    .unwrap();

  assert_eq!(second.email, "new@uni.edu");
  assert_eq!(second.role, Role::Student);
  assert_eq!(second.created_at, first.created_at);

  let all = s.list_users(None).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(s.get_user("u1".into()).await.unwrap(), Some(second));
}

#[tokio::test]
async fn list_users_filters_by_role() {
  let s = store().await;
  s.upsert_user(user("a", "a@uni.edu", Role::Student)).await.unwrap();
  s.upsert_user(user("b", "b@uni.edu", Role::Supervisor)).await.unwrap();
  s.upsert_user(user("c", "c@uni.edu", Role::Student)).await.unwrap();

  let students = s.list_users(Some(Role::Student)).await.unwrap();
  let ids: Vec<_> = students.iter().map(|u| u.user_id.as_str()).collect();
  assert_eq!(ids, ["a", "c"]);
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_student_profile_is_idempotent() {
  let s = store().await;
  let first = s.ensure_student_profile("stu".into()).await.unwrap();
  s.set_research_topic("stu".into(), "graph databases".into(), None)
    .await
    .unwrap();
  let again = s.ensure_student_profile("stu".into()).await.unwrap();

  assert_eq!(again.created_at, first.created_at);
  assert_eq!(again.research_topic.as_deref(), Some("graph databases"));
  assert!(
    s.set_research_topic("ghost".into(), "x".into(), None)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn supervisor_roster_keeps_creation_order() {
  let s = store().await;
  for (id, tags) in [("sup-1", vec!["Machine Learning", "ai"]), ("sup-2", vec!["security"])] {
    s.upsert_supervisor_profile(NewSupervisorProfile {
      user_id:     id.into(),
      name:        id.into(),
      school:      "Computing".into(),
      department:  "CS".into(),
      specialties: tags.into_iter().map(String::from).collect(),
    })
    .await
    .unwrap();
  }
  // Re-upserting the first must not move it to the back.
  s.upsert_supervisor_profile(NewSupervisorProfile {
    user_id:     "sup-1".into(),
    name:        "Dr. One".into(),
    school:      "Computing".into(),
    department:  "CS".into(),
    specialties: vec!["machine learning".into(), "healthcare".into()],
  })
  .await
  .unwrap();

  let roster = s.list_supervisor_profiles().await.unwrap();
  assert_eq!(roster[0].user_id, "sup-1");
  assert_eq!(roster[0].name, "Dr. One");
  assert_eq!(roster[0].specialties, ["machine learning", "healthcare"]);
  assert_eq!(roster[1].user_id, "sup-2");
}

// ─── Proposals ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn proposals_list_newest_first_with_filters() {
  let s = store().await;
  let first = proposal(&s, "a", "one").await;
  let second = proposal(&s, "b", "two").await;
  s.record_assignment(assign(first, "sup", AssignmentSource::Auto))
    .await
    .unwrap();

  let all = s.list_proposals(ProposalQuery::default()).await.unwrap();
  assert_eq!(all[0].proposal_id, second);
  assert_eq!(all[1].proposal_id, first);

  let unassigned = s
    .list_proposals(ProposalQuery { unassigned_only: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(unassigned.len(), 1);
  assert_eq!(unassigned[0].proposal_id, second);

  let by_student = s
    .list_proposals(ProposalQuery {
      student_id: Some("a".into()),
      status: Some(ProposalStatus::Pending),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_student.len(), 1);
}

#[tokio::test]
async fn auto_assignment_is_conditional() {
  let s = store().await;
  let p = proposal(&s, "stu", "ml").await;

  let first = s
    .record_assignment(assign(p, "sup-1", AssignmentSource::Auto))
    .await
    .unwrap();
  assert!(matches!(first, AssignmentOutcome::Assigned { superseded: None, .. }));

  let second = s
    .record_assignment(assign(p, "sup-2", AssignmentSource::Auto))
    .await
    .unwrap();
  assert_eq!(second, AssignmentOutcome::AlreadyAssigned {
    supervisor_id: "sup-1".into(),
  });

  let same = s
    .record_assignment(assign(p, "sup-1", AssignmentSource::Coordinator))
    .await
    .unwrap();
  assert_eq!(same, AssignmentOutcome::Unchanged);

  let students = s.list_students_by_supervisor("sup-1".into()).await.unwrap();
  assert_eq!(students.len(), 1);
  assert_eq!(students[0].user_id, "stu");
}

#[tokio::test]
async fn coordinator_assignment_supersedes_and_archives() {
  let s = store().await;
  let p = proposal(&s, "stu", "ml").await;
  s.record_assignment(assign(p, "sup-1", AssignmentSource::Auto))
    .await
    .unwrap();

  let outcome = s
    .record_assignment(assign(p, "sup-2", AssignmentSource::Coordinator))
    .await
    .unwrap();
  let AssignmentOutcome::Assigned { assignment, superseded: Some(old) } = outcome else {
    panic!("expected supersession, got {outcome:?}");
  };
  assert_eq!(old.supervisor_id, "sup-1");
  assert_eq!(old.superseded_at, Some(assignment.recorded_at));

  let history = s.list_assignments(p).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0], old);
  assert_eq!(history[1], assignment);

  let profile = s.get_student_profile("stu".into()).await.unwrap().unwrap();
  assert_eq!(profile.supervisor_id.as_deref(), Some("sup-2"));
  assert!(s.list_students_by_supervisor("sup-1".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn review_only_applies_to_pending_proposals() {
  let s = store().await;
  let p = proposal(&s, "stu", "ml").await;
  let decision = |status| ReviewDecision {
    status,
    feedback: Some("ok".into()),
    reviewed_by: "coord".into(),
  };

  let approved = s
    .record_review(p, decision(ProposalStatus::Approved))
    .await
    .unwrap()
    .expect("pending proposal is reviewable");
  assert_eq!(approved.status, ProposalStatus::Approved);
  assert!(approved.reviewed_at.is_some());

  assert!(
    s.record_review(p, decision(ProposalStatus::Rejected))
      .await
      .unwrap()
      .is_none()
  );
  assert!(
    s.record_review(Uuid::new_v4(), decision(ProposalStatus::Rejected))
      .await
      .unwrap()
      .is_none()
  );

  let outcome = s
    .record_assignment(assign(p, "sup", AssignmentSource::Coordinator))
    .await
    .unwrap();
  assert_eq!(outcome, AssignmentOutcome::NotPending(ProposalStatus::Approved));
  assert_eq!(
    s.record_assignment(assign(Uuid::new_v4(), "sup", AssignmentSource::Auto))
      .await
      .unwrap(),
    AssignmentOutcome::ProposalNotFound
  );
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn notification_flags_are_one_way() {
  let s = store().await;
  let n = s
    .create_notification(NewNotification::new(
      "stu",
      NotificationKind::Approval,
      "Proposal approved",
      "Well done",
    ))
    .await
    .unwrap();
  assert_eq!(s.count_unread_notifications("stu".into()).await.unwrap(), 1);

  let read = s.mark_notification_read(n.notification_id).await.unwrap().unwrap();
  let again = s.mark_notification_read(n.notification_id).await.unwrap().unwrap();
  assert!(read.is_read);
  assert_eq!(read, again);
  assert_eq!(s.count_unread_notifications("stu".into()).await.unwrap(), 0);

  let resolved = s
    .mark_notification_resolved(n.notification_id)
    .await
    .unwrap()
    .unwrap();
  let twice = s
    .mark_notification_resolved(n.notification_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(resolved, twice);
  assert!(s.mark_notification_read(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn notifications_list_newest_first() {
  let s = store().await;
  for title in ["first", "second", "third"] {
    s.create_notification(NewNotification::new(
      "stu",
      NotificationKind::StatusChange,
      title,
      "",
    ))
    .await
    .unwrap();
  }
  s.create_notification(NewNotification::new("other", NotificationKind::Comment, "x", ""))
    .await
    .unwrap();

  let feed = s.list_notifications("stu".into()).await.unwrap();
  let titles: Vec<_> = feed.iter().map(|n| n.title.as_str()).collect();
  assert_eq!(titles, ["third", "second", "first"]);
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn resolving_comment_notifications_counts_changes() {
  let s = store().await;
  let c = s
    .create_comment(NewComment {
      student_id:        "stu".into(),
      supervisor_id:     "sup".into(),
      thesis_version_id: None,
      content:           "Expand the related work".into(),
    })
    .await
    .unwrap();
  let n = s
    .create_notification(
      NewNotification::new("stu", NotificationKind::Comment, "Comment", c.content.clone())
        .from_user("sup")
        .about_comment(c.comment_id),
    )
    .await
    .unwrap();
  assert_eq!(n.comment_id, Some(c.comment_id));

  assert_eq!(s.resolve_comment_notifications(c.comment_id).await.unwrap(), 1);
  assert_eq!(s.resolve_comment_notifications(c.comment_id).await.unwrap(), 0);

  let resolved = s.mark_comment_resolved(c.comment_id).await.unwrap().unwrap();
  assert!(resolved.is_resolved);
  let approved = s.mark_comment_approved(c.comment_id).await.unwrap().unwrap();
  assert!(approved.is_approved && approved.is_resolved);

  assert_eq!(s.list_comments("stu".into()).await.unwrap(), vec![approved]);
}

// ─── Thesis versions ─────────────────────────────────────────────────────────

fn version(student: &str, title: &str, is_final: bool) -> NewThesisVersion {
  NewThesisVersion {
    student_id: student.into(),
    title: title.into(),
    notes: None,
    file_url: "https://files.example/thesis.pdf".into(),
    is_final,
  }
}

#[tokio::test]
async fn only_one_final_version_per_student() {
  let s = store().await;
  let v1 = s.create_thesis_version(version("stu", "draft", true)).await.unwrap();
  let v2 = s.create_thesis_version(version("stu", "final", true)).await.unwrap();
  s.create_thesis_version(version("other", "theirs", true)).await.unwrap();
  assert_eq!((v1.version_number, v2.version_number), (1, 2));

  let listed = s.list_thesis_versions("stu".into()).await.unwrap();
  assert!(!listed[0].is_final);
  assert!(listed[1].is_final);

  let marked = s.mark_final_version(v1.version_id).await.unwrap().unwrap();
  assert!(marked.is_final);
  let listed = s.list_thesis_versions("stu".into()).await.unwrap();
  assert_eq!(listed.iter().filter(|v| v.is_final).count(), 1);
  assert!(listed[0].is_final);

  let theirs = s.list_thesis_versions("other".into()).await.unwrap();
  assert!(theirs[0].is_final);
  assert!(s.mark_final_version(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Admin sessions ──────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_sessions_roundtrip() {
  let s = store().await;
  let now = timestamp();
  let session = AdminSession {
    token_digest: "ab".repeat(32),
    email:        "root@uni.edu".into(),
    issued_at:    now,
    expires_at:   now + Duration::hours(24),
  };
  s.create_admin_session(session.clone()).await.unwrap();

  assert_eq!(s.get_admin_session("ab".repeat(32)).await.unwrap(), Some(session));
  assert!(s.get_admin_session("missing".into()).await.unwrap().is_none());
}
