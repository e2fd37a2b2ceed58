//! Thesis version uploads.

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::Identity,
  store::ThesisStore,
  thesis::{NewThesisVersion, ThesisVersion},
  user::Role,
  workflow::effective_role,
};

#[derive(Debug, Clone, Deserialize)]
pub struct VersionUpload {
  #[serde(default)]
  pub title:    String,
  pub notes:    Option<String>,
  #[serde(default)]
  pub file_url: String,
  #[serde(default)]
  pub is_final: bool,
}

/// Record a new version for the calling student.
pub async fn upload_version<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  input: VersionUpload,
) -> Result<ThesisVersion> {
  let title = input.title.trim().to_owned();
  let file_url = input.file_url.trim().to_owned();
  if title.is_empty() {
    return Err(Error::Validation("title required".into()));
  }
  if file_url.is_empty() {
    return Err(Error::Validation("file_url required".into()));
  }
  if effective_role(store, identity).await? != Role::Student {
    return Err(Error::Forbidden("only students upload thesis versions".into()));
  }

  store
    .create_thesis_version(NewThesisVersion {
      student_id: identity.id.clone(),
      title,
      notes: input.notes.filter(|n| !n.trim().is_empty()),
      file_url,
      is_final: input.is_final,
    })
    .await
    .map_err(Error::store)
}

/// A student's versions, oldest first. Students may only list their own.
pub async fn list_versions<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  student_id: String,
) -> Result<Vec<ThesisVersion>> {
  if student_id != identity.id && !effective_role(store, identity).await?.is_staff() {
    return Err(Error::Forbidden("cannot read another student's versions".into()));
  }
  store.list_thesis_versions(student_id).await.map_err(Error::store)
}

/// Flag one of the caller's versions as final.
pub async fn mark_final<S: ThesisStore>(
  store: &S,
  identity: &Identity,
  version_id: Uuid,
) -> Result<ThesisVersion> {
  let not_found = || Error::NotFound(format!("thesis version {version_id} not found"));
  let version = store
    .get_thesis_version(version_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(not_found)?;
  if version.student_id != identity.id {
    return Err(Error::Forbidden("only the owning student may do that".into()));
  }
  store
    .mark_final_version(version_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{memory::MemoryStore, workflow::tests::identity};

  fn upload(title: &str, is_final: bool) -> VersionUpload {
    VersionUpload {
      title: title.into(),
      notes: None,
      file_url: format!("https://files.example/{title}.pdf"),
      is_final,
    }
  }

  #[tokio::test]
  async fn versions_are_numbered_per_student() {
    let store = MemoryStore::new();
    let a = identity("a", Role::Student);
    let b = identity("b", Role::Student);

    upload_version(&store, &a, upload("draft", false)).await.unwrap();
    upload_version(&store, &b, upload("outline", false)).await.unwrap();
    let second = upload_version(&store, &a, upload("revision", false)).await.unwrap();
    assert_eq!(second.version_number, 2);

    let listed = list_versions(&store, &a, "a".into()).await.unwrap();
    let numbers: Vec<u32> = listed.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![1, 2]);
  }

  #[tokio::test]
  async fn at_most_one_version_is_final() {
    let store = MemoryStore::new();
    let a = identity("a", Role::Student);

    let first = upload_version(&store, &a, upload("one", true)).await.unwrap();
    upload_version(&store, &a, upload("two", true)).await.unwrap();
    let finals = |vs: Vec<ThesisVersion>| vs.into_iter().filter(|v| v.is_final).count();
    assert_eq!(finals(list_versions(&store, &a, "a".into()).await.unwrap()), 1);

    let marked = mark_final(&store, &a, first.version_id).await.unwrap();
    assert!(marked.is_final);
    let listed = list_versions(&store, &a, "a".into()).await.unwrap();
    assert!(listed[0].is_final);
    assert!(!listed[1].is_final);
  }

  #[tokio::test]
  async fn uploads_are_validated_and_owned() {
    let store = MemoryStore::new();
    let a = identity("a", Role::Student);

    let err = upload_version(&store, &a, VersionUpload {
      file_url: String::new(),
      ..upload("x", false)
    })
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let v = upload_version(&store, &a, upload("mine", false)).await.unwrap();
    let err = mark_final(&store, &identity("b", Role::Student), v.version_id)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let err = mark_final(&store, &a, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
  }
}
