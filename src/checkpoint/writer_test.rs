//! Tests for checkpoint writers.

use super::writer::{OutputSlot, StagedData};
use super::{CheckpointWriter, DocWriter, LpgWriter, RelWriter};
use crate::error::ActivityError;
use crate::types::{Document, Edge, Field, Node, Schema, Value, ValueType};

fn schema() -> Schema {
  Schema::new(vec![Field::new("id", ValueType::Integer)]).unwrap()
}

fn rel_writer() -> RelWriter {
  let slot = OutputSlot::new(
    0,
    StagedData::Rel {
      schema: schema(),
      tuples: vec![],
      drop_existing: true,
    },
  );
  RelWriter::new(0, schema(), slot)
}

#[test]
fn rel_writer_validates_tuples() {
  let mut w = rel_writer();
  w.write(vec![Value::from(1_i64)]).unwrap();
  assert!(w.write(vec![Value::from("x")]).is_err());
  assert_eq!(w.written(), 1);
}

#[test]
fn write_after_close_fails() {
  let mut w = rel_writer();
  w.close().unwrap();
  w.close().unwrap();
  let err = w.write(vec![Value::from(1_i64)]).unwrap_err();
  assert!(matches!(err, ActivityError::WriterClosed(0)));
}

#[test]
fn doc_writer_row_view() {
  let slot = OutputSlot::new(1, StagedData::Doc { documents: vec![] });
  let mut w = DocWriter::new(1, slot.clone());
  w.write_tuple(vec![Value::from(Document::new().with("a", 1_i64))])
    .unwrap();
  assert!(w.write_tuple(vec![Value::from(1_i64)]).is_err());
  assert!(w.write_tuple(vec![]).is_err());
  let guard = slot.lock().unwrap();
  match &guard.data {
    StagedData::Doc { documents } => assert_eq!(documents.len(), 1),
    other => panic!("unexpected {other:?}"),
  }
}

#[test]
fn lpg_writer_accepts_dangling_edges() {
  let slot = OutputSlot::new(
    0,
    StagedData::Lpg {
      nodes: vec![],
      edges: vec![],
    },
  );
  let mut w = LpgWriter::new(0, slot.clone());
  w.write_edge(Edge::new("e1", "x", "y")).unwrap();
  w.write_tuple(vec![Value::from(Node::new("x"))]).unwrap();
  assert_eq!(w.written(), 2);
  let guard = slot.lock().unwrap();
  match &guard.data {
    StagedData::Lpg { nodes, edges } => {
      assert_eq!(nodes.len(), 1);
      assert_eq!(edges.len(), 1);
    }
    other => panic!("unexpected {other:?}"),
  }
}
