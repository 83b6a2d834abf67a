//! Tests for `Node` and `Edge`.

use super::{Edge, Node, Value};

#[test]
fn node_builder_collects_labels_and_properties() {
  let n = Node::new("n1")
    .with_label("Person")
    .with_label("Person")
    .with_property("name", "Ada");
  assert_eq!(n.labels.len(), 1);
  assert_eq!(n.properties.get("name"), Some(&Value::from("Ada")));
}

#[test]
fn edge_json_defaults_missing_labels() {
  let e: Edge = serde_json::from_str(r#"{"id":"e1","source":"a","target":"b"}"#).unwrap();
  assert_eq!(e, Edge::new("e1", "a", "b"));
  assert!(e.labels.is_empty());
}

#[test]
fn edge_builder() {
  let e = Edge::new("e1", "a", "b").with_label("KNOWS").with_property("since", 2020_i64);
  assert!(e.labels.contains("KNOWS"));
  assert_eq!(e.properties.get("since"), Some(&Value::Integer(2020)));
}
