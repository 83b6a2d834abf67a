//! Tests for the graph identity.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::lpg_identity::LpgIdentity;
use crate::activity::{Activity, ExecutionContext, Pipeable, PortSpec, VariableStore};
use crate::checkpoint::{Checkpoint, CheckpointKey, CheckpointStore};
use crate::error::ActivityError;
use crate::pipe::{CancellationToken, channel, drain_into, feed_from_reader};
use crate::types::{DataModel, Edge, Node, Settings, SettingsPreview, TypePreview};

fn graph() -> Checkpoint {
  Checkpoint::lpg(
    vec![
      Node::new("p1").with_label("Person"),
      Node::new("p2").with_label("Person"),
      Node::new("c1").with_label("City"),
    ],
    vec![
      Edge::new("e1", "p1", "c1").with_label("LIVES_IN"),
      Edge::new("e2", "p1", "p2").with_label("KNOWS"),
    ],
  )
}

fn ids(cp: &Checkpoint) -> (BTreeSet<String>, BTreeSet<String>) {
  let Checkpoint::Lpg(g) = cp else {
    panic!("expected a graph checkpoint");
  };
  (
    g.nodes.iter().map(|n| n.id.clone()).collect(),
    g.edges.iter().map(|e| e.id.clone()).collect(),
  )
}

fn ctx(store: &CheckpointStore, id: Uuid) -> ExecutionContext {
  ExecutionContext::new(
    id,
    vec![PortSpec::single("out", DataModel::Lpg)],
    store.clone(),
    VariableStore::new(),
    CancellationToken::new(),
  )
}

#[test]
fn preview_and_lock_return_input_type() {
  let t = graph().type_preview();
  let a = LpgIdentity;
  assert_eq!(
    a.preview_out_types(&[t.clone()], &SettingsPreview::default())
      .unwrap(),
    vec![t.clone()]
  );
  assert_eq!(a.lock_output_type(&[t.clone()], &Settings::default()).unwrap(), t);
  assert!(matches!(
    a.lock_output_type(&[TypePreview::doc(["x"])], &Settings::default()),
    Err(ActivityError::TypeMismatch { .. })
  ));
}

#[tokio::test]
async fn batch_copies_nodes_and_edges() {
  let input = graph();
  let store = CheckpointStore::new();
  let id = Uuid::new_v4();
  let mut c = ctx(&store, id);
  LpgIdentity
    .as_batch()
    .unwrap()
    .execute(vec![Some(input.reader())], &Settings::default(), &mut c)
    .await
    .unwrap();
  c.commit().unwrap();
  let out = store.get(&CheckpointKey::new(id, 0)).unwrap().unwrap();
  assert_eq!(ids(&out), ids(&input));
  assert_eq!(out.type_preview(), input.type_preview());
}

#[tokio::test]
async fn batch_fails_on_inactive_input() {
  let store = CheckpointStore::new();
  let mut c = ctx(&store, Uuid::new_v4());
  let err = LpgIdentity
    .as_batch()
    .unwrap()
    .execute(vec![None], &Settings::default(), &mut c)
    .await
    .unwrap_err();
  assert!(matches!(err, ActivityError::InputFailure { port: 0, .. }));
}

#[tokio::test]
async fn pipe_keeps_node_and_edge_sets() {
  let input = graph();
  let reader = input.reader();
  let cancel = CancellationToken::new();
  let t = reader.tuple_type();
  let (src, stage_in) = channel(1, t.clone(), &cancel);
  let (stage_out, sink) = channel(1, t, &cancel);

  let store = CheckpointStore::new();
  let id = Uuid::new_v4();
  let mut c = ctx(&store, id);
  let mut writer = c.create_lpg_writer(0).unwrap();
  let mut a = LpgIdentity;
  let settings = Settings::default();
  futures::future::try_join3(
    feed_from_reader(reader.as_ref(), src),
    a.pipe(vec![stage_in], stage_out, &settings, &cancel),
    drain_into(sink, &mut writer),
  )
  .await
  .unwrap();
  drop(writer);
  c.commit().unwrap();
  let out = store.get(&CheckpointKey::new(id, 0)).unwrap().unwrap();
  assert_eq!(ids(&out), ids(&input));
}
