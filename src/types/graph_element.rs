//! Labeled-property graph elements.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Document;

/// A graph node: identifier, labels and a property document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id: String,
  #[serde(default)]
  pub labels: BTreeSet<String>,
  #[serde(default)]
  pub properties: Document,
}

impl Node {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      labels: BTreeSet::new(),
      properties: Document::new(),
    }
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.labels.insert(label.into());
    self
  }

  pub fn with_property(mut self, key: impl Into<String>, value: impl Into<super::Value>) -> Self {
    self.properties.insert(key, value);
    self
  }
}

/// A directed graph edge between two node ids.
///
/// Endpoints are not checked when an edge is written; the checkpoint store checks
/// them when the graph is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
  pub id: String,
  pub source: String,
  pub target: String,
  #[serde(default)]
  pub labels: BTreeSet<String>,
  #[serde(default)]
  pub properties: Document,
}

impl Edge {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      labels: BTreeSet::new(),
      properties: Document::new(),
    }
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.labels.insert(label.into());
    self
  }

  pub fn with_property(mut self, key: impl Into<String>, value: impl Into<super::Value>) -> Self {
    self.properties.insert(key, value);
    self
  }
}
