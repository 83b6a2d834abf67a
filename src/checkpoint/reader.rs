//! Read handles over committed checkpoints.
//!
//! Readers are restartable: every call to `iter`, `nodes` or `edges` starts a new pass
//! over the same data, so a graph can be read node pass first and edge pass second.

use std::sync::Arc;

use super::{DocCheckpoint, LpgCheckpoint, RelCheckpoint, document_fields};
use crate::types::{DataModel, Document, Edge, Node, Schema, Tuple, TypePreview, Value};

/// Uniform read interface over a checkpoint of any model.
pub trait CheckpointReader: Send + Sync {
  fn data_model(&self) -> DataModel;

  /// Concrete type of the data behind this reader.
  fn tuple_type(&self) -> TypePreview;

  /// Number of records a full `iter` pass yields.
  fn count(&self) -> usize;

  /// Row view of the data. Documents, nodes and edges appear as one-value tuples;
  /// a graph yields all nodes before any edge.
  fn iter(&self) -> Box<dyn Iterator<Item = Tuple> + Send + '_>;

  fn as_rel(&self) -> Option<&RelReader> {
    None
  }

  fn as_doc(&self) -> Option<&DocReader> {
    None
  }

  fn as_lpg(&self) -> Option<&LpgReader> {
    None
  }
}

/// Reader over a relational checkpoint.
pub struct RelReader {
  data: Arc<RelCheckpoint>,
}

impl RelReader {
  pub fn new(data: Arc<RelCheckpoint>) -> Self {
    Self { data }
  }

  pub fn schema(&self) -> &Schema {
    &self.data.schema
  }

  pub fn tuples(&self) -> impl Iterator<Item = &Tuple> + Send + '_ {
    self.data.tuples.iter()
  }
}

impl CheckpointReader for RelReader {
  fn data_model(&self) -> DataModel {
    DataModel::Rel
  }

  fn tuple_type(&self) -> TypePreview {
    TypePreview::rel(self.data.schema.clone())
  }

  fn count(&self) -> usize {
    self.data.tuples.len()
  }

  fn iter(&self) -> Box<dyn Iterator<Item = Tuple> + Send + '_> {
    Box::new(self.data.tuples.iter().cloned())
  }

  fn as_rel(&self) -> Option<&RelReader> {
    Some(self)
  }
}

/// Reader over a document collection.
pub struct DocReader {
  data: Arc<DocCheckpoint>,
}

impl DocReader {
  pub fn new(data: Arc<DocCheckpoint>) -> Self {
    Self { data }
  }

  pub fn documents(&self) -> impl Iterator<Item = &Document> + Send + '_ {
    self.data.documents.iter()
  }
}

impl CheckpointReader for DocReader {
  fn data_model(&self) -> DataModel {
    DataModel::Doc
  }

  fn tuple_type(&self) -> TypePreview {
    TypePreview::Doc {
      known_fields: document_fields(self.data.documents.iter()),
    }
  }

  fn count(&self) -> usize {
    self.data.documents.len()
  }

  fn iter(&self) -> Box<dyn Iterator<Item = Tuple> + Send + '_> {
    Box::new(
      self
        .data
        .documents
        .iter()
        .map(|d| vec![Value::Document(d.clone())]),
    )
  }

  fn as_doc(&self) -> Option<&DocReader> {
    Some(self)
  }
}

/// Reader over a graph; nodes and edges are separate passes.
pub struct LpgReader {
  data: Arc<LpgCheckpoint>,
}

impl LpgReader {
  pub fn new(data: Arc<LpgCheckpoint>) -> Self {
    Self { data }
  }

  pub fn nodes(&self) -> impl Iterator<Item = &Node> + Send + '_ {
    self.data.nodes.iter()
  }

  pub fn edges(&self) -> impl Iterator<Item = &Edge> + Send + '_ {
    self.data.edges.iter()
  }

  pub fn node_count(&self) -> usize {
    self.data.nodes.len()
  }

  pub fn edge_count(&self) -> usize {
    self.data.edges.len()
  }
}

impl CheckpointReader for LpgReader {
  fn data_model(&self) -> DataModel {
    DataModel::Lpg
  }

  fn tuple_type(&self) -> TypePreview {
    TypePreview::Lpg {
      node_labels: self.data.nodes.iter().flat_map(|n| n.labels.iter().cloned()).collect(),
      edge_labels: self.data.edges.iter().flat_map(|e| e.labels.iter().cloned()).collect(),
    }
  }

  fn count(&self) -> usize {
    self.data.nodes.len() + self.data.edges.len()
  }

  fn iter(&self) -> Box<dyn Iterator<Item = Tuple> + Send + '_> {
    let nodes = self.nodes().map(|n| vec![Value::from(n.clone())]);
    let edges = self.edges().map(|e| vec![Value::from(e.clone())]);
    Box::new(nodes.chain(edges))
  }

  fn as_lpg(&self) -> Option<&LpgReader> {
    Some(self)
  }
}
