//! End-to-end runs of built-in activities wired into small workflows through a shared
//! checkpoint store.

use std::collections::BTreeMap;

use polyweave::types::{Field, ValueType};
use polyweave::{
  ActivityInstance, Checkpoint, CheckpointKey, CheckpointStore, Document, Edge, EngineConfig,
  ExecutionMode, Executor, Node, Schema, TypePreview, Value, VariableStore, default_registry,
};
use proptest::prelude::*;
use serde_json::json;
use uuid::Uuid;

fn instance(activity_type: &str, settings: serde_json::Value) -> ActivityInstance {
  let raw: BTreeMap<String, serde_json::Value> =
    serde_json::from_value(settings).expect("settings object");
  default_registry()
    .instantiate(activity_type, &raw)
    .expect("instantiate")
}

fn put(ex: &Executor, cp: Checkpoint) -> CheckpointKey {
  let key = CheckpointKey::new(Uuid::new_v4(), 0);
  ex.store().put(key, cp).expect("put");
  key
}

fn rows(ex: &Executor, key: &CheckpointKey) -> Vec<Vec<Value>> {
  ex.store()
    .reader(key)
    .expect("reader")
    .expect("checkpoint")
    .iter()
    .collect()
}

#[tokio::test]
async fn source_limit_identity_workflow() {
  let ex = Executor::new(EngineConfig::default());
  let mut values = instance("relValues", json!({}));
  let mut limit = instance("relLimit", json!({ "limit": 2 }));
  let mut identity = instance("relIdentity", json!({}));

  let a = ex
    .execute(&mut values, &[], ExecutionMode::Batch)
    .await
    .expect("values");
  let b = ex
    .execute(&mut limit, &[Some(a.output_key(0))], ExecutionMode::Pipe)
    .await
    .expect("limit");
  let c = ex
    .execute(&mut identity, &[Some(b.output_key(0))], ExecutionMode::Batch)
    .await
    .expect("identity");

  assert_eq!(ex.store().len(), 3);
  let out = rows(&ex, &c.output_key(0));
  assert_eq!(out.len(), 2);
  assert_eq!(out[0][1], Value::from("Alice"));
  assert_eq!(out, polyweave::activities::values_rows()[..2].to_vec());
}

#[tokio::test]
async fn doc_merge_unions_fields_and_keeps_every_document() {
  let ex = Executor::new(EngineConfig::default());
  let left = put(
    &ex,
    Checkpoint::doc(vec![Document::new().with("a", 1_i64).with("b", 2_i64)]),
  );
  let right = put(
    &ex,
    Checkpoint::doc(vec![Document::new().with("b", 3_i64).with("c", 4_i64)]),
  );
  let mut merge = instance("docMerge", json!({}));
  let preview = polyweave::executor::preview(
    &merge,
    &[
      TypePreview::doc(["a", "b"]),
      TypePreview::doc(["b", "c"]),
      TypePreview::Unknown,
    ],
  )
  .expect("preview");
  assert_eq!(preview, vec![TypePreview::doc(["a", "b", "c"])]);

  let report = ex
    .execute(&mut merge, &[Some(left), Some(right), None], ExecutionMode::Batch)
    .await
    .expect("merge");
  let out = ex.store().get(&report.output_key(0)).expect("get").expect("output");
  assert_eq!(out.len(), 2);
  assert_eq!(out.type_preview(), TypePreview::doc(["a", "b", "c"]));
}

#[tokio::test]
async fn or_merge_of_three_with_one_active_input() {
  let ex = Executor::new(EngineConfig::default());
  let only = put(&ex, Checkpoint::lpg(vec![Node::new("n")], vec![]));
  let mut merge = instance("lpgMerge", json!({}));
  let report = ex
    .execute(&mut merge, &[None, Some(only), None], ExecutionMode::Batch)
    .await
    .expect("merge");
  assert!(report.produced);
  let out = ex.store().get(&report.output_key(0)).expect("get").expect("output");
  assert_eq!(out, Checkpoint::lpg(vec![Node::new("n")], vec![]));
}

#[tokio::test]
async fn or_merge_with_all_inputs_inactive_skips_downstream_output() {
  let ex = Executor::new(EngineConfig::default());
  let mut merge = instance("docMerge", json!({}));
  let report = ex
    .execute(&mut merge, &[None, None, None], ExecutionMode::Batch)
    .await
    .expect("merge");
  assert!(!report.produced);
  assert!(!ex.store().contains(&report.output_key(0)));

  // an AND activity downstream of the skipped merge fails on its inactive input
  let mut identity = instance("lpgIdentity", json!({}));
  let err = ex
    .execute(&mut identity, &[Some(report.output_key(0))], ExecutionMode::Batch)
    .await
    .expect_err("inactive input");
  assert_eq!(err.kind(), polyweave::ErrorKind::InputFailure);
}

#[tokio::test]
async fn graph_merge_then_identity_chain() {
  let ex = Executor::new(EngineConfig::default());
  let g1 = put(
    &ex,
    Checkpoint::lpg(
      vec![Node::new("a").with_label("City"), Node::new("b")],
      vec![Edge::new("ab", "a", "b").with_label("ROAD")],
    ),
  );
  let g2 = put(
    &ex,
    Checkpoint::lpg(
      vec![Node::new("b").with_label("Town"), Node::new("c")],
      vec![Edge::new("bc", "b", "c")],
    ),
  );
  let mut merge = instance("lpgMerge", json!({}));
  let merged = ex
    .execute(&mut merge, &[Some(g1), Some(g2)], ExecutionMode::Batch)
    .await
    .expect("merge");

  let mut chain = vec![instance("lpgIdentity", json!({}))];
  let report = ex
    .run_pipe_chain(&mut chain, &[Some(merged.output_key(0))])
    .await
    .expect("chain");
  let out = ex.store().get(&report.output_key(0)).expect("get").expect("output");
  match out {
    Checkpoint::Lpg(g) => {
      let ids: Vec<&str> = g.nodes.iter().map(|n| n.id.as_str()).collect();
      assert_eq!(ids, vec!["a", "b", "c"]);
      assert_eq!(g.edges.len(), 2);
    }
    other => panic!("expected a graph, got {:?}", other.data_model()),
  }
}

#[tokio::test]
async fn executors_share_store_and_variables() {
  let store = CheckpointStore::new();
  let variables = VariableStore::new();
  let first = Executor::with_store(EngineConfig::default(), store.clone(), variables.clone());
  let second = Executor::with_store(EngineConfig::default(), store.clone(), variables.clone());

  let mut set = instance("setVariable", json!({ "name": "threshold", "value": 7 }));
  first
    .execute(&mut set, &[], ExecutionMode::Batch)
    .await
    .expect("set");
  let mut values = instance("relValues", json!({}));
  let report = first
    .execute(&mut values, &[], ExecutionMode::Pipe)
    .await
    .expect("values");

  assert_eq!(second.variables().get("threshold"), Some(json!(7)));
  assert!(second.store().contains(&report.output_key(0)));
  assert_eq!(store.len(), 1);
}

fn run_identity(n: i64, capacity: usize) -> Vec<Vec<Value>> {
  let rt = tokio::runtime::Builder::new_current_thread()
    .build()
    .expect("runtime");
  rt.block_on(async {
    let config = EngineConfig {
      pipe_capacity: capacity,
      ..EngineConfig::default()
    };
    let ex = Executor::new(config);
    let schema = Schema::new(vec![Field::new("k", ValueType::Integer)]).expect("schema");
    let input = put(
      &ex,
      Checkpoint::rel(schema, (0..n).map(|i| vec![Value::from(i)]).collect()),
    );
    let mut chain = vec![
      instance("relIdentity", json!({})),
      instance("relIdentity", json!({})),
    ];
    let report = ex
      .run_pipe_chain(&mut chain, &[Some(input)])
      .await
      .expect("chain");
    rows(&ex, &report.output_key(0))
  })
}

proptest! {
  #[test]
  fn pipe_chain_preserves_every_tuple_in_order(n in 0_i64..200, capacity in 1_usize..8) {
    let out = run_identity(n, capacity);
    let expected: Vec<Vec<Value>> = (0..n).map(|i| vec![Value::from(i)]).collect();
    prop_assert_eq!(out, expected);
  }
}
