//! Materialized per-port data between DAG stages, and the reader/writer handles
//! activities use to reach it.
//!
//! A checkpoint is owned by the [CheckpointStore]; readers and writers are handles
//! scoped to one activity call.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ActivityError, ActivityResult};
use crate::types::{DataModel, Document, Edge, Node, Schema, Tuple, TypePreview};

mod reader;
mod store;
mod writer;
#[cfg(test)]
mod writer_test;

pub use reader::{CheckpointReader, DocReader, LpgReader, RelReader};
pub use store::CheckpointStore;
pub use writer::{CheckpointWriter, DocWriter, LpgWriter, RelWriter};
pub(crate) use writer::{OutputSlot, StagedData};

/// Identifies one output port of one activity run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointKey {
  pub activity_id: Uuid,
  pub port: usize,
}

impl CheckpointKey {
  pub fn new(activity_id: Uuid, port: usize) -> Self {
    Self { activity_id, port }
  }
}

impl fmt::Display for CheckpointKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.activity_id, self.port)
  }
}

/// Relational checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelCheckpoint {
  pub schema: Schema,
  pub tuples: Vec<Tuple>,
}

/// Document collection checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocCheckpoint {
  pub documents: Vec<Document>,
}

/// Graph checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LpgCheckpoint {
  pub nodes: Vec<Node>,
  pub edges: Vec<Edge>,
}

/// One checkpoint of any model. Cloning shares the underlying data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Checkpoint {
  Rel(Arc<RelCheckpoint>),
  Doc(Arc<DocCheckpoint>),
  Lpg(Arc<LpgCheckpoint>),
}

impl Checkpoint {
  pub fn rel(schema: Schema, tuples: Vec<Tuple>) -> Self {
    Checkpoint::Rel(Arc::new(RelCheckpoint { schema, tuples }))
  }

  pub fn doc(documents: Vec<Document>) -> Self {
    Checkpoint::Doc(Arc::new(DocCheckpoint { documents }))
  }

  pub fn lpg(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
    Checkpoint::Lpg(Arc::new(LpgCheckpoint { nodes, edges }))
  }

  pub fn data_model(&self) -> DataModel {
    match self {
      Checkpoint::Rel(_) => DataModel::Rel,
      Checkpoint::Doc(_) => DataModel::Doc,
      Checkpoint::Lpg(_) => DataModel::Lpg,
    }
  }

  /// Number of records (tuples, documents, or nodes plus edges).
  pub fn len(&self) -> usize {
    match self {
      Checkpoint::Rel(r) => r.tuples.len(),
      Checkpoint::Doc(d) => d.documents.len(),
      Checkpoint::Lpg(g) => g.nodes.len() + g.edges.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// A fresh read handle over this checkpoint.
  pub fn reader(&self) -> Box<dyn CheckpointReader> {
    match self {
      Checkpoint::Rel(r) => Box::new(RelReader::new(Arc::clone(r))),
      Checkpoint::Doc(d) => Box::new(DocReader::new(Arc::clone(d))),
      Checkpoint::Lpg(g) => Box::new(LpgReader::new(Arc::clone(g))),
    }
  }

  /// Concrete type of the stored data.
  pub fn type_preview(&self) -> TypePreview {
    self.reader().tuple_type()
  }

  /// Storage-side integrity check run before a checkpoint becomes visible.
  ///
  /// Relational tuples must match the schema. Graph node and edge ids must be unique
  /// and every edge endpoint must name a node of the same checkpoint.
  pub fn validate(&self) -> ActivityResult<()> {
    match self {
      Checkpoint::Rel(r) => {
        for t in &r.tuples {
          r.schema.validate(t)?;
        }
        Ok(())
      }
      Checkpoint::Doc(_) => Ok(()),
      Checkpoint::Lpg(g) => {
        let mut node_ids = HashSet::new();
        for n in &g.nodes {
          if !node_ids.insert(n.id.as_str()) {
            return Err(ActivityError::storage(format!("duplicate node id '{}'", n.id)));
          }
        }
        let mut edge_ids = HashSet::new();
        for e in &g.edges {
          if !edge_ids.insert(e.id.as_str()) {
            return Err(ActivityError::storage(format!("duplicate edge id '{}'", e.id)));
          }
          for endpoint in [&e.source, &e.target] {
            if !node_ids.contains(endpoint.as_str()) {
              return Err(ActivityError::storage(format!(
                "edge '{}' references missing node '{}'",
                e.id, endpoint
              )));
            }
          }
        }
        Ok(())
      }
    }
  }
}

/// Known fields over a set of documents: every key seen in any document.
pub(crate) fn document_fields<'a>(docs: impl Iterator<Item = &'a Document>) -> BTreeSet<String> {
  docs.flat_map(|d| d.keys().map(str::to_string)).collect()
}
