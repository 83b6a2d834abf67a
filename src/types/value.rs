//! Runtime values flowing between activities.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Edge, Node};

/// Type tag of a [Value]; also the column type of a [super::Schema] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
  Null,
  Boolean,
  Integer,
  Double,
  String,
  List,
  Document,
  Node,
  Edge,
}

impl fmt::Display for ValueType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ValueType::Null => "NULL",
      ValueType::Boolean => "BOOLEAN",
      ValueType::Integer => "INTEGER",
      ValueType::Double => "DOUBLE",
      ValueType::String => "STRING",
      ValueType::List => "LIST",
      ValueType::Document => "DOCUMENT",
      ValueType::Node => "NODE",
      ValueType::Edge => "EDGE",
    };
    f.write_str(s)
  }
}

fn by_id(a: &str, b: &str, equal: bool) -> Option<Ordering> {
  match a.cmp(b) {
    Ordering::Equal if !equal => None,
    ord => Some(ord),
  }
}

/// Non-finite doubles are written as the strings `NaN`, `inf` and `-inf`; JSON has no
/// number for them.
mod double_repr {
  use serde::de::Error;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    if v.is_finite() {
      s.serialize_f64(*v)
    } else if v.is_nan() {
      s.serialize_str("NaN")
    } else if v.is_sign_positive() {
      s.serialize_str("inf")
    } else {
      s.serialize_str("-inf")
    }
  }

  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Repr {
    Number(f64),
    Text(String),
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    match Repr::deserialize(d)? {
      Repr::Number(n) => Ok(n),
      Repr::Text(t) => match t.as_str() {
        "NaN" => Ok(f64::NAN),
        "inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        other => Err(D::Error::custom(format!("'{}' is not a double", other))),
      },
    }
  }
}

/// A tagged runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
  Null,
  Boolean(bool),
  Integer(i64),
  Double(#[serde(with = "double_repr")] f64),
  String(String),
  List(Vec<Value>),
  Document(Document),
  Node(Box<Node>),
  Edge(Box<Edge>),
}

impl Value {
  pub fn value_type(&self) -> ValueType {
    match self {
      Value::Null => ValueType::Null,
      Value::Boolean(_) => ValueType::Boolean,
      Value::Integer(_) => ValueType::Integer,
      Value::Double(_) => ValueType::Double,
      Value::String(_) => ValueType::String,
      Value::List(_) => ValueType::List,
      Value::Document(_) => ValueType::Document,
      Value::Node(_) => ValueType::Node,
      Value::Edge(_) => ValueType::Edge,
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_integer(&self) -> Option<i64> {
    match self {
      Value::Integer(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_document(&self) -> Option<&Document> {
    match self {
      Value::Document(d) => Some(d),
      _ => None,
    }
  }

  pub fn as_node(&self) -> Option<&Node> {
    match self {
      Value::Node(n) => Some(n),
      _ => None,
    }
  }

  pub fn as_edge(&self) -> Option<&Edge> {
    match self {
      Value::Edge(e) => Some(e),
      _ => None,
    }
  }

  /// Type-aware ordering. Values of different type tags are incomparable, so an
  /// integer never compares against a double or a string.
  ///
  /// Agrees with `==`: `Some(Equal)` only for equal values. Nodes and edges order by
  /// id; two different elements sharing an id are incomparable. Documents are only
  /// comparable for equality.
  pub fn compare(&self, other: &Value) -> Option<Ordering> {
    match (self, other) {
      (Value::Null, Value::Null) => Some(Ordering::Equal),
      (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
      (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
      (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
      (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
      (Value::List(a), Value::List(b)) => {
        for (x, y) in a.iter().zip(b.iter()) {
          match x.compare(y)? {
            Ordering::Equal => continue,
            other => return Some(other),
          }
        }
        Some(a.len().cmp(&b.len()))
      }
      (Value::Document(a), Value::Document(b)) => (a == b).then_some(Ordering::Equal),
      (Value::Node(a), Value::Node(b)) => by_id(&a.id, &b.id, a == b),
      (Value::Edge(a), Value::Edge(b)) => by_id(&a.id, &b.id, a == b),
      _ => None,
    }
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Boolean(b)
  }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self {
    Value::Integer(i)
  }
}

impl From<i32> for Value {
  fn from(i: i32) -> Self {
    Value::Integer(i64::from(i))
  }
}

impl From<f64> for Value {
  fn from(f: f64) -> Self {
    Value::Double(f)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}

impl From<Document> for Value {
  fn from(d: Document) -> Self {
    Value::Document(d)
  }
}

impl From<Node> for Value {
  fn from(n: Node) -> Self {
    Value::Node(Box::new(n))
  }
}

impl From<Edge> for Value {
  fn from(e: Edge) -> Self {
    Value::Edge(Box::new(e))
  }
}

/// String-keyed map of values.
///
/// Keys are unique. Iteration follows insertion order; equality does not.
#[derive(Debug, Clone, Default)]
pub struct Document {
  entries: Vec<(String, Value)>,
}

impl Document {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts or replaces `key`. A replaced key keeps its original position.
  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
    let key = key.into();
    let value = value.into();
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some((_, slot)) => Some(std::mem::replace(slot, value)),
      None => {
        self.entries.push((key, value));
        None
      }
    }
  }

  /// Builder-style [Document::insert].
  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(key, value);
    self
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    let pos = self.entries.iter().position(|(k, _)| k == key)?;
    Some(self.entries.remove(pos).1)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl PartialEq for Document {
  fn eq(&self, other: &Self) -> bool {
    self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut doc = Document::new();
    for (k, v) in iter {
      doc.insert(k, v);
    }
    doc
  }
}

impl Serialize for Document {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (k, v) in &self.entries {
      map.serialize_entry(k, v)?;
    }
    map.end()
  }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
  type Value = Document;

  fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("a map of field names to values")
  }

  fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Document, M::Error> {
    let mut doc = Document::new();
    while let Some((key, value)) = access.next_entry::<String, Value>()? {
      doc.insert(key, value);
    }
    Ok(doc)
  }
}

impl<'de> Deserialize<'de> for Document {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_map(DocumentVisitor)
  }
}
