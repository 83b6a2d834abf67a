//! Tests for `Value` and `Document`.

use std::cmp::Ordering;

use super::{Document, Node, Value, ValueType};

#[test]
fn value_type_tags() {
  assert_eq!(Value::Null.value_type(), ValueType::Null);
  assert_eq!(Value::from(3_i64).value_type(), ValueType::Integer);
  assert_eq!(Value::from("x").value_type(), ValueType::String);
  assert_eq!(Value::from(Node::new("n1")).value_type(), ValueType::Node);
}

#[test]
fn compare_is_type_aware() {
  assert_eq!(
    Value::from(1_i64).compare(&Value::from(2_i64)),
    Some(Ordering::Less)
  );
  assert_eq!(Value::from(1_i64).compare(&Value::from(1.0)), None);
  assert_eq!(Value::from("1").compare(&Value::from(1_i64)), None);
}

#[test]
fn compare_lists_lexicographically() {
  let a = Value::List(vec![Value::from(1_i64), Value::from(2_i64)]);
  let b = Value::List(vec![Value::from(1_i64), Value::from(3_i64)]);
  let c = Value::List(vec![Value::from(1_i64)]);
  assert_eq!(a.compare(&b), Some(Ordering::Less));
  assert_eq!(c.compare(&a), Some(Ordering::Less));
}

#[test]
fn compare_agrees_with_equality() {
  let plain = Value::from(Node::new("n"));
  let labeled = Value::from(Node::new("n").with_label("City"));
  assert_ne!(plain, labeled);
  assert_eq!(plain.compare(&labeled), None);
  assert_eq!(plain.compare(&plain.clone()), Some(Ordering::Equal));
  assert_eq!(
    plain.compare(&Value::from(Node::new("m"))),
    Some(Ordering::Greater)
  );

  let a = Value::from(Document::new().with("a", 1_i64).with("b", 2_i64));
  let b = Value::from(Document::new().with("b", 2_i64).with("a", 1_i64));
  assert_eq!(a.compare(&b), Some(Ordering::Equal));
  assert_eq!(a.compare(&Value::from(Document::new())), None);
}

#[test]
fn non_finite_doubles_survive_json() {
  for v in [f64::INFINITY, f64::NEG_INFINITY, 2.5] {
    let json = serde_json::to_string(&Value::from(v)).unwrap();
    assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), Value::from(v));
  }
  let json = serde_json::to_string(&Value::from(f64::NAN)).unwrap();
  assert_eq!(json, r#"{"type":"double","value":"NaN"}"#);
  match serde_json::from_str::<Value>(&json).unwrap() {
    Value::Double(d) => assert!(d.is_nan()),
    other => panic!("expected a double, got {:?}", other),
  }
  assert!(serde_json::from_str::<Value>(r#"{"type":"double","value":"lots"}"#).is_err());
  assert_eq!(
    serde_json::from_str::<Value>(r#"{"type":"double","value":3}"#).unwrap(),
    Value::from(3.0)
  );
}

#[test]
fn document_equality_ignores_order() {
  let a = Document::new().with("a", 1_i64).with("b", "x");
  let b = Document::new().with("b", "x").with("a", 1_i64);
  assert_eq!(a, b);
  assert_ne!(a, Document::new().with("a", 1_i64));
}

#[test]
fn document_iteration_keeps_insertion_order() {
  let d = Document::new().with("z", 1_i64).with("a", 2_i64).with("m", 3_i64);
  let keys: Vec<&str> = d.keys().collect();
  assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn document_insert_replaces_in_place() {
  let mut d = Document::new().with("a", 1_i64).with("b", 2_i64);
  let old = d.insert("a", 5_i64);
  assert_eq!(old, Some(Value::Integer(1)));
  assert_eq!(d.len(), 2);
  assert_eq!(d.keys().next(), Some("a"));
  assert_eq!(d.get("a"), Some(&Value::Integer(5)));
}

#[test]
fn document_remove() {
  let mut d = Document::new().with("a", 1_i64);
  assert_eq!(d.remove("a"), Some(Value::Integer(1)));
  assert!(d.is_empty());
  assert_eq!(d.remove("a"), None);
}

#[test]
fn document_serializes_as_ordered_map() {
  let d = Document::new().with("z", 1_i64).with("a", true);
  let json = serde_json::to_string(&d).unwrap();
  assert_eq!(
    json,
    r#"{"z":{"type":"integer","value":1},"a":{"type":"boolean","value":true}}"#
  );
  let back: Document = serde_json::from_str(&json).unwrap();
  assert_eq!(back.keys().collect::<Vec<_>>(), vec!["z", "a"]);
}

#[test]
fn null_serializes_without_content() {
  let json = serde_json::to_string(&Value::Null).unwrap();
  assert_eq!(json, r#"{"type":"null"}"#);
  let back: Value = serde_json::from_str(&json).unwrap();
  assert!(back.is_null());
}
