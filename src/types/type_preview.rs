//! Speculative, pre-execution output shapes.
//!
//! A [TypePreview] is a conservative approximation: whatever it states as known must
//! hold at runtime, while the runtime data may carry more fields or labels than the
//! preview lists. Previews are computed without touching data and compose across DAG
//! edges.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::Schema;
use crate::error::{ActivityError, ActivityResult};

/// Data model tag of a port or checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataModel {
  Rel,
  Doc,
  Lpg,
}

impl fmt::Display for DataModel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DataModel::Rel => write!(f, "REL"),
      DataModel::Doc => write!(f, "DOC"),
      DataModel::Lpg => write!(f, "LPG"),
    }
  }
}

/// Pre-execution approximation of one port's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum TypePreview {
  /// Relational output. `exact` is false when further columns may still appear.
  Rel { schema: Schema, exact: bool },
  /// Documents; `known_fields` is a lower bound on the fields present.
  Doc { known_fields: BTreeSet<String> },
  /// Graph; known node and edge labels.
  Lpg {
    node_labels: BTreeSet<String>,
    edge_labels: BTreeSet<String>,
  },
  /// Not resolvable yet (e.g. upstream settings not bound).
  Unknown,
}

impl TypePreview {
  pub fn rel(schema: Schema) -> Self {
    TypePreview::Rel {
      schema,
      exact: true,
    }
  }

  pub fn doc<I, S>(fields: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    TypePreview::Doc {
      known_fields: fields.into_iter().map(Into::into).collect(),
    }
  }

  pub fn lpg<N, E, S>(node_labels: N, edge_labels: E) -> Self
  where
    N: IntoIterator<Item = S>,
    E: IntoIterator<Item = S>,
    S: Into<String>,
  {
    TypePreview::Lpg {
      node_labels: node_labels.into_iter().map(Into::into).collect(),
      edge_labels: edge_labels.into_iter().map(Into::into).collect(),
    }
  }

  /// The least specific preview that still fixes the data model.
  pub fn empty_of(model: DataModel) -> Self {
    match model {
      DataModel::Rel => TypePreview::Rel {
        schema: Schema::empty(),
        exact: false,
      },
      DataModel::Doc => TypePreview::Doc {
        known_fields: BTreeSet::new(),
      },
      DataModel::Lpg => TypePreview::Lpg {
        node_labels: BTreeSet::new(),
        edge_labels: BTreeSet::new(),
      },
    }
  }

  pub fn data_model(&self) -> Option<DataModel> {
    match self {
      TypePreview::Rel { .. } => Some(DataModel::Rel),
      TypePreview::Doc { .. } => Some(DataModel::Doc),
      TypePreview::Lpg { .. } => Some(DataModel::Lpg),
      TypePreview::Unknown => None,
    }
  }

  pub fn is_unknown(&self) -> bool {
    matches!(self, TypePreview::Unknown)
  }

  /// Short model name for error messages.
  pub fn model_name(&self) -> String {
    self
      .data_model()
      .map(|m| m.to_string())
      .unwrap_or_else(|| "UNKNOWN".to_string())
  }

  /// Fails with `TypeMismatch` when this preview is concrete and of another model.
  pub fn expect_model(&self, port: usize, model: DataModel) -> ActivityResult<()> {
    match self.data_model() {
      Some(m) if m != model => Err(ActivityError::type_mismatch(
        port,
        model.to_string(),
        m.to_string(),
      )),
      _ => Ok(()),
    }
  }

  /// Like [TypePreview::expect_model] but also rejects `Unknown`; used where a concrete
  /// type is required (locking a pipe's output type).
  pub fn require_model(&self, port: usize, model: DataModel) -> ActivityResult<()> {
    if self.is_unknown() {
      return Err(ActivityError::type_mismatch(
        port,
        model.to_string(),
        "UNKNOWN",
      ));
    }
    self.expect_model(port, model)
  }

  /// True when `self` states everything `coarser` states (and possibly more).
  ///
  /// `Unknown` is refined by anything. Within one model, known fields and labels may
  /// only grow; an exact relational schema may not change at all.
  pub fn refines(&self, coarser: &TypePreview) -> bool {
    match (self, coarser) {
      (_, TypePreview::Unknown) => true,
      (
        TypePreview::Rel { schema, .. },
        TypePreview::Rel {
          schema: coarse,
          exact: true,
        },
      ) => schema == coarse,
      (TypePreview::Rel { schema, .. }, TypePreview::Rel { schema: coarse, .. }) => {
        coarse.fields().iter().all(|f| schema.fields().contains(f))
      }
      (
        TypePreview::Doc { known_fields },
        TypePreview::Doc {
          known_fields: coarse,
        },
      ) => coarse.is_subset(known_fields),
      (
        TypePreview::Lpg {
          node_labels,
          edge_labels,
        },
        TypePreview::Lpg {
          node_labels: coarse_nodes,
          edge_labels: coarse_edges,
        },
      ) => coarse_nodes.is_subset(node_labels) && coarse_edges.is_subset(edge_labels),
      _ => false,
    }
  }
}

impl fmt::Display for TypePreview {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TypePreview::Rel { schema, exact } => {
        write!(f, "REL{}", schema)?;
        if !exact {
          write!(f, "+")?;
        }
        Ok(())
      }
      TypePreview::Doc { known_fields } => write!(f, "DOC{:?}", known_fields),
      TypePreview::Lpg {
        node_labels,
        edge_labels,
      } => write!(f, "LPG(nodes={:?}, edges={:?})", node_labels, edge_labels),
      TypePreview::Unknown => write!(f, "UNKNOWN"),
    }
  }
}

/// Union of the known fields of all document inputs.
///
/// `Unknown` inputs contribute nothing; any other model is a `TypeMismatch` on that
/// input's port.
#[instrument(level = "trace")]
pub fn union_doc(inputs: &[TypePreview]) -> ActivityResult<TypePreview> {
  let mut fields = BTreeSet::new();
  for (port, input) in inputs.iter().enumerate() {
    match input {
      TypePreview::Doc { known_fields } => fields.extend(known_fields.iter().cloned()),
      TypePreview::Unknown => {}
      other => {
        return Err(ActivityError::type_mismatch(port, "DOC", other.model_name()));
      }
    }
  }
  Ok(TypePreview::Doc {
    known_fields: fields,
  })
}

/// Union of the known node and edge labels of all graph inputs.
#[instrument(level = "trace")]
pub fn union_lpg(inputs: &[TypePreview]) -> ActivityResult<TypePreview> {
  let mut nodes = BTreeSet::new();
  let mut edges = BTreeSet::new();
  for (port, input) in inputs.iter().enumerate() {
    match input {
      TypePreview::Lpg {
        node_labels,
        edge_labels,
      } => {
        nodes.extend(node_labels.iter().cloned());
        edges.extend(edge_labels.iter().cloned());
      }
      TypePreview::Unknown => {}
      other => {
        return Err(ActivityError::type_mismatch(port, "LPG", other.model_name()));
      }
    }
  }
  Ok(TypePreview::Lpg {
    node_labels: nodes,
    edge_labels: edges,
  })
}
