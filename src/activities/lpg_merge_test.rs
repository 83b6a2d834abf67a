//! Tests for the graph merge.

use uuid::Uuid;

use super::lpg_merge::LpgMerge;
use crate::activity::{Activity, ExecutionContext, PortSpec, VariableStore};
use crate::checkpoint::{Checkpoint, CheckpointKey, CheckpointStore};
use crate::pipe::CancellationToken;
use crate::types::{DataModel, Edge, Node, Settings, SettingsPreview, TypePreview};

#[test]
fn preview_is_union_of_labels() {
  let out = LpgMerge
    .preview_out_types(
      &[
        TypePreview::lpg(["Person"], ["KNOWS"]),
        TypePreview::Unknown,
        TypePreview::lpg(["City"], [] as [&str; 0]),
      ],
      &SettingsPreview::default(),
    )
    .unwrap();
  assert_eq!(out, vec![TypePreview::lpg(["City", "Person"], ["KNOWS"])]);
}

#[tokio::test]
async fn first_node_per_id_wins_and_edges_follow_nodes() {
  let left = Checkpoint::lpg(
    vec![
      Node::new("a").with_label("Person").with_property("v", 1_i64),
      Node::new("b"),
    ],
    vec![Edge::new("ab", "a", "b")],
  );
  let right = Checkpoint::lpg(
    vec![Node::new("a").with_property("v", 2_i64), Node::new("c")],
    vec![Edge::new("ac", "a", "c"), Edge::new("ab", "a", "b")],
  );
  let store = CheckpointStore::new();
  let id = Uuid::new_v4();
  let mut ctx = ExecutionContext::new(
    id,
    vec![PortSpec::single("out", DataModel::Lpg)],
    store.clone(),
    VariableStore::new(),
    CancellationToken::new(),
  );
  LpgMerge
    .as_batch()
    .unwrap()
    .execute(
      vec![Some(left.reader()), None, Some(right.reader())],
      &Settings::default(),
      &mut ctx,
    )
    .await
    .unwrap();
  ctx.commit().unwrap();

  let out = store.get(&CheckpointKey::new(id, 0)).unwrap().unwrap();
  let Checkpoint::Lpg(g) = out else {
    panic!("expected a graph checkpoint");
  };
  let ids: Vec<_> = g.nodes.iter().map(|n| n.id.as_str()).collect();
  assert_eq!(ids, vec!["a", "b", "c"]);
  assert_eq!(
    g.nodes[0].properties.get("v").and_then(|v| v.as_integer()),
    Some(1)
  );
  let edge_ids: Vec<_> = g.edges.iter().map(|e| e.id.as_str()).collect();
  assert_eq!(edge_ids, vec!["ab", "ac"]);
}

#[tokio::test]
async fn no_active_input_no_output() {
  let store = CheckpointStore::new();
  let mut ctx = ExecutionContext::new(
    Uuid::new_v4(),
    vec![PortSpec::single("out", DataModel::Lpg)],
    store.clone(),
    VariableStore::new(),
    CancellationToken::new(),
  );
  LpgMerge
    .as_batch()
    .unwrap()
    .execute(vec![None, None, None], &Settings::default(), &mut ctx)
    .await
    .unwrap();
  assert!(ctx.active_ports().is_empty());
}
