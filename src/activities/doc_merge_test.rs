//! Tests for the document merge.

use uuid::Uuid;

use super::doc_merge::DocMerge;
use crate::activity::{Activity, ExecutionContext, PortSpec, VariableStore};
use crate::checkpoint::{Checkpoint, CheckpointKey, CheckpointStore};
use crate::error::ActivityError;
use crate::pipe::CancellationToken;
use crate::types::{DataModel, Document, Settings, SettingsPreview, TypePreview};

fn ctx(store: &CheckpointStore, id: Uuid) -> ExecutionContext {
  ExecutionContext::new(
    id,
    vec![PortSpec::single("out", DataModel::Doc)],
    store.clone(),
    VariableStore::new(),
    CancellationToken::new(),
  )
}

#[test]
fn preview_is_union_of_known_fields() {
  let a = DocMerge;
  let s = SettingsPreview::default();
  let out = a
    .preview_out_types(
      &[
        TypePreview::doc(["a", "b"]),
        TypePreview::doc(["b", "c"]),
        TypePreview::Unknown,
      ],
      &s,
    )
    .unwrap();
  assert_eq!(out, vec![TypePreview::doc(["a", "b", "c"])]);
  assert!(matches!(
    a.preview_out_types(&[TypePreview::doc(["a"]), TypePreview::lpg(["N"], ["E"])], &s),
    Err(ActivityError::TypeMismatch { port: 1, .. })
  ));
}

#[tokio::test]
async fn one_active_input_of_three_is_copied() {
  let store = CheckpointStore::new();
  let id = Uuid::new_v4();
  let docs = vec![
    Document::new().with("k", 1_i64),
    Document::new().with("k", 2_i64),
  ];
  let mut c = ctx(&store, id);
  DocMerge
    .as_batch()
    .unwrap()
    .execute(
      vec![None, Some(Checkpoint::doc(docs.clone()).reader()), None],
      &Settings::default(),
      &mut c,
    )
    .await
    .unwrap();
  c.commit().unwrap();
  let out = store.get(&CheckpointKey::new(id, 0)).unwrap().unwrap();
  match out {
    Checkpoint::Doc(d) => assert_eq!(d.documents, docs),
    other => panic!("unexpected {:?}", other),
  }
}

#[tokio::test]
async fn all_inactive_creates_no_output() {
  let store = CheckpointStore::new();
  let mut c = ctx(&store, Uuid::new_v4());
  DocMerge
    .as_batch()
    .unwrap()
    .execute(vec![None, None], &Settings::default(), &mut c)
    .await
    .unwrap();
  assert!(c.active_ports().is_empty());
  c.commit().unwrap();
  assert!(store.is_empty());
}
