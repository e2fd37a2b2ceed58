//! Supervisor allocation by topic keyword matching.
//!
//! A supervisor's score for a topic is the number of their specialty tags
//! that occur as substrings of the lower-cased topic. The strictly highest
//! score wins; on a tie the supervisor met first in roster order is kept.

use serde::{Deserialize, Serialize};

use crate::profile::SupervisorProfile;

/// The winning supervisor and the score that won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
  pub supervisor_id: String,
  pub score:         usize,
}

/// Number of `specialties` found in `topic_lower`. Tags are compared
/// lower-cased; empty tags never count.
pub fn score<T: AsRef<str>>(topic_lower: &str, specialties: &[T]) -> usize {
  specialties
    .iter()
    .map(|tag| tag.as_ref().trim().to_lowercase())
    .filter(|tag| !tag.is_empty() && topic_lower.contains(tag.as_str()))
    .count()
}

/// Pick the best-matching supervisor for `topic` from `roster`.
///
/// Returns `None` when the topic is blank, the roster is empty, or every
/// supervisor scores zero.
pub fn allocate<'a, I>(topic: &str, roster: I) -> Option<Match>
where
  I: IntoIterator<Item = &'a SupervisorProfile>,
{
  let topic = topic.trim().to_lowercase();
  if topic.is_empty() {
    return None;
  }

  let mut best: Option<Match> = None;
  for supervisor in roster {
    let s = score(&topic, &supervisor.specialties);
    if s > 0 && best.as_ref().is_none_or(|b| s > b.score) {
      best = Some(Match { supervisor_id: supervisor.user_id.clone(), score: s });
    }
  }
  best
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn supervisor(id: &str, tags: &[&str]) -> SupervisorProfile {
    let now = Utc::now();
    SupervisorProfile {
      user_id:     id.into(),
      name:        format!("Dr. {id}"),
      school:      "School of Computing".into(),
      department:  "Computer Science".into(),
      specialties: tags.iter().map(|t| t.to_string()).collect(),
      created_at:  now,
      updated_at:  now,
    }
  }

  fn roster() -> Vec<SupervisorProfile> {
    vec![
      supervisor("sup-1", &["machine learning", "healthcare"]),
      supervisor("sup-2", &["security"]),
    ]
  }

  #[test]
  fn best_overlap_wins() {
    let m = allocate("Applying machine learning to healthcare records", &roster())
      .expect("a match");
    assert_eq!(m.supervisor_id, "sup-1");
    assert_eq!(m.score, 2);
  }

  #[test]
  fn no_overlap_is_no_match() {
    assert_eq!(allocate("Quantum cryptography", &roster()), None);
  }

  #[test]
  fn topic_case_is_ignored() {
    let m = allocate("NETWORK SECURITY audits", &roster()).unwrap();
    assert_eq!(m.supervisor_id, "sup-2");
  }

  #[test]
  fn tags_with_capitals_still_match() {
    let r = vec![supervisor("sup-9", &["Machine Learning"])];
    assert_eq!(allocate("machine learning for crops", &r).unwrap().score, 1);
  }

  #[test]
  fn tie_keeps_first_in_roster_order() {
    let r = vec![
      supervisor("first", &["web"]),
      supervisor("second", &["performance"]),
    ];
    let m = allocate("web performance", &r).unwrap();
    assert_eq!(m.supervisor_id, "first");
    assert_eq!(m.score, 1);
  }

  #[test]
  fn later_strictly_higher_score_replaces_earlier() {
    let r = vec![
      supervisor("one", &["web"]),
      supervisor("two", &["web", "performance"]),
    ];
    assert_eq!(allocate("web performance", &r).unwrap().supervisor_id, "two");
  }

  #[test]
  fn empty_inputs_never_match() {
    assert_eq!(allocate("", &roster()), None);
    assert_eq!(allocate("   ", &roster()), None);
    assert_eq!(allocate("machine learning", &Vec::new()), None);
    let blank = vec![supervisor("blank", &["", "  "])];
    assert_eq!(allocate("anything at all", &blank), None);
  }

  #[test]
  fn allocation_is_deterministic() {
    let r = roster();
    let topic = "healthcare security with machine learning";
    let first = allocate(topic, &r);
    for _ in 0..10 {
      assert_eq!(allocate(topic, &r), first);
    }
  }

  #[test]
  fn a_match_implies_some_tag_is_a_substring() {
    let r = roster();
    for topic in [
      "Applying machine learning to healthcare records",
      "Quantum cryptography",
      "security of healthcare devices",
      "distributed systems",
    ] {
      let lower = topic.to_lowercase();
      let any_tag = r
        .iter()
        .flat_map(|s| s.specialties.iter())
        .any(|t| lower.contains(t.as_str()));
      assert_eq!(allocate(topic, &r).is_some(), any_tag, "topic: {topic}");
    }
  }
}
