//! Tests for `ExecutionContext` writer handling and commit.

use uuid::Uuid;

use super::{ExecutionContext, PortSpec, VariableStore};
use crate::checkpoint::{Checkpoint, CheckpointKey, CheckpointStore, CheckpointWriter};
use crate::error::ActivityError;
use crate::pipe::CancellationToken;
use crate::types::{DataModel, Document, Edge, Field, Node, Schema, Value, ValueType};

fn schema() -> Schema {
  Schema::new(vec![Field::new("id", ValueType::Integer)]).unwrap()
}

fn ctx(store: &CheckpointStore, id: Uuid, outputs: Vec<PortSpec>) -> ExecutionContext {
  ExecutionContext::new(
    id,
    outputs,
    store.clone(),
    VariableStore::new(),
    CancellationToken::new(),
  )
}

#[test]
fn nothing_is_visible_before_commit() {
  let store = CheckpointStore::new();
  let id = Uuid::new_v4();
  let mut c = ctx(&store, id, vec![PortSpec::single("out", DataModel::Doc)]);
  let mut w = c.create_doc_writer(0).unwrap();
  w.write(Document::new().with("a", 1_i64)).unwrap();
  assert!(store.is_empty());
  assert_eq!(c.active_ports(), vec![0]);
  let rows = c.commit().unwrap();
  assert_eq!(rows.get(&0), Some(&1));
  assert_eq!(store.get(&CheckpointKey::new(id, 0)).unwrap().unwrap().len(), 1);
  // the call is over; the writer is closed
  assert!(matches!(
    w.write(Document::new()),
    Err(ActivityError::WriterClosed(0))
  ));
}

#[test]
fn writer_port_checks() {
  let store = CheckpointStore::new();
  let mut c = ctx(&store, Uuid::new_v4(), vec![PortSpec::single("out", DataModel::Lpg)]);
  assert!(c.create_lpg_writer(1).is_err());
  assert!(matches!(
    c.create_doc_writer(0),
    Err(ActivityError::TypeMismatch { port: 0, .. })
  ));
  c.create_lpg_writer(0).unwrap();
  assert!(c.create_lpg_writer(0).is_err());
}

#[test]
fn discard_leaves_store_untouched() {
  let store = CheckpointStore::new();
  let mut c = ctx(&store, Uuid::new_v4(), vec![PortSpec::single("out", DataModel::Rel)]);
  let mut w = c.create_rel_writer(0, schema(), true).unwrap();
  w.write(vec![Value::from(1_i64)]).unwrap();
  c.discard();
  assert!(store.is_empty());
  assert!(w.write(vec![Value::from(2_i64)]).is_err());
}

#[test]
fn invalid_graph_fails_whole_commit() {
  let store = CheckpointStore::new();
  let mut c = ctx(
    &store,
    Uuid::new_v4(),
    vec![
      PortSpec::single("docs", DataModel::Doc),
      PortSpec::single("graph", DataModel::Lpg),
    ],
  );
  c.create_doc_writer(0).unwrap().write(Document::new()).unwrap();
  let mut g = c.create_lpg_writer(1).unwrap();
  g.write_node(Node::new("a")).unwrap();
  g.write_edge(Edge::new("e", "a", "missing")).unwrap();
  assert!(c.commit().is_err());
  assert!(store.is_empty());
}

#[test]
fn drop_existing_replaces_and_append_extends() {
  let store = CheckpointStore::new();
  let id = Uuid::new_v4();
  let key = CheckpointKey::new(id, 0);
  store
    .put(key, Checkpoint::rel(schema(), vec![vec![Value::from(1_i64)]]))
    .unwrap();
  let outputs = vec![PortSpec::single("out", DataModel::Rel)];

  let mut c = ctx(&store, id, outputs.clone());
  c.create_rel_writer(0, schema(), false)
    .unwrap()
    .write(vec![Value::from(2_i64)])
    .unwrap();
  c.commit().unwrap();
  assert_eq!(store.get(&key).unwrap().unwrap().len(), 2);

  let mut c = ctx(&store, id, outputs.clone());
  let mut w = c.create_rel_writer(0, schema(), true).unwrap();
  w.write(vec![Value::from(3_i64)]).unwrap();
  w.close().unwrap();
  c.commit().unwrap();
  assert_eq!(store.get(&key).unwrap().unwrap().len(), 1);
}

#[test]
fn append_with_other_schema_fails() {
  let store = CheckpointStore::new();
  let id = Uuid::new_v4();
  store
    .put(CheckpointKey::new(id, 0), Checkpoint::rel(schema(), vec![]))
    .unwrap();
  let other = Schema::new(vec![Field::new("name", ValueType::String)]).unwrap();
  let mut c = ctx(&store, id, vec![PortSpec::single("out", DataModel::Rel)]);
  c.create_rel_writer(0, other, false).unwrap();
  assert!(matches!(c.commit(), Err(ActivityError::Storage(_))));
}

#[test]
fn cancellation_is_observed() {
  let store = CheckpointStore::new();
  let cancel = CancellationToken::new();
  let c = ExecutionContext::new(
    Uuid::new_v4(),
    vec![],
    store,
    VariableStore::new(),
    cancel.clone(),
  )
  .with_check_interval(2);
  assert!(c.check_cancelled().is_ok());
  cancel.cancel();
  assert!(c.check_cancelled_at(1).is_ok());
  assert!(c.check_cancelled_at(2).unwrap_err().is_cancellation());
}
