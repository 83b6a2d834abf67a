//! Write handles obtained from the execution context.
//!
//! Writes are staged in a slot shared with the context; nothing reaches the store
//! until the context commits after a successful call. A writer that is closed, or
//! whose call has already committed, rejects further writes.

use std::sync::{Arc, Mutex};

use crate::error::{ActivityError, ActivityResult};
use crate::types::{DataModel, Document, Edge, Node, Schema, Tuple, Value};

/// Data written so far to one output port.
#[derive(Debug)]
pub(crate) enum StagedData {
  Rel {
    schema: Schema,
    tuples: Vec<Tuple>,
    drop_existing: bool,
  },
  Doc {
    documents: Vec<Document>,
  },
  Lpg {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
  },
}

/// Staging area shared between a writer and the execution context.
#[derive(Debug)]
pub(crate) struct OutputSlot {
  pub port: usize,
  pub data: StagedData,
  pub closed: bool,
  pub written: usize,
}

impl OutputSlot {
  pub(crate) fn new(port: usize, data: StagedData) -> Arc<Mutex<Self>> {
    Arc::new(Mutex::new(Self {
      port,
      data,
      closed: false,
      written: 0,
    }))
  }
}

fn lock(slot: &Mutex<OutputSlot>) -> ActivityResult<std::sync::MutexGuard<'_, OutputSlot>> {
  slot
    .lock()
    .map_err(|_| ActivityError::storage("output slot lock poisoned"))
}

fn with_open_slot<R>(
  slot: &Mutex<OutputSlot>,
  f: impl FnOnce(&mut OutputSlot) -> R,
) -> ActivityResult<R> {
  let mut guard = lock(slot)?;
  if guard.closed {
    return Err(ActivityError::WriterClosed(guard.port));
  }
  let r = f(&mut guard);
  guard.written += 1;
  Ok(r)
}

fn close_slot(slot: &Mutex<OutputSlot>) -> ActivityResult<()> {
  lock(slot)?.closed = true;
  Ok(())
}

fn written(slot: &Mutex<OutputSlot>) -> usize {
  lock(slot).map(|g| g.written).unwrap_or(0)
}

fn single_value(mut tuple: Tuple, model: DataModel) -> ActivityResult<Value> {
  if tuple.len() != 1 {
    return Err(ActivityError::execution(format!(
      "{} writer expects one value per tuple, got {}",
      model,
      tuple.len()
    )));
  }
  Ok(tuple.remove(0))
}

/// Uniform write interface over a checkpoint of any model.
pub trait CheckpointWriter: Send {
  fn port(&self) -> usize;

  fn data_model(&self) -> DataModel;

  /// Writes one row-view tuple (see [super::CheckpointReader::iter]).
  fn write_tuple(&mut self, tuple: Tuple) -> ActivityResult<()>;

  /// Marks the output complete. Idempotent.
  fn close(&mut self) -> ActivityResult<()>;

  /// Records written through this port so far.
  fn written(&self) -> usize;
}

/// Writer for a relational output.
pub struct RelWriter {
  port: usize,
  schema: Schema,
  slot: Arc<Mutex<OutputSlot>>,
}

impl RelWriter {
  pub(crate) fn new(port: usize, schema: Schema, slot: Arc<Mutex<OutputSlot>>) -> Self {
    Self { port, schema, slot }
  }

  pub fn schema(&self) -> &Schema {
    &self.schema
  }

  /// Appends a tuple after checking it against the writer's schema.
  pub fn write(&mut self, tuple: Tuple) -> ActivityResult<()> {
    self.schema.validate(&tuple)?;
    with_open_slot(&self.slot, |slot| {
      if let StagedData::Rel { tuples, .. } = &mut slot.data {
        tuples.push(tuple);
      }
    })
  }

  pub fn write_all(&mut self, tuples: impl IntoIterator<Item = Tuple>) -> ActivityResult<()> {
    for t in tuples {
      self.write(t)?;
    }
    Ok(())
  }
}

impl CheckpointWriter for RelWriter {
  fn port(&self) -> usize {
    self.port
  }

  fn data_model(&self) -> DataModel {
    DataModel::Rel
  }

  fn write_tuple(&mut self, tuple: Tuple) -> ActivityResult<()> {
    self.write(tuple)
  }

  fn close(&mut self) -> ActivityResult<()> {
    close_slot(&self.slot)
  }

  fn written(&self) -> usize {
    written(&self.slot)
  }
}

/// Writer for a document output.
pub struct DocWriter {
  port: usize,
  slot: Arc<Mutex<OutputSlot>>,
}

impl DocWriter {
  pub(crate) fn new(port: usize, slot: Arc<Mutex<OutputSlot>>) -> Self {
    Self { port, slot }
  }

  pub fn write(&mut self, document: Document) -> ActivityResult<()> {
    with_open_slot(&self.slot, |slot| {
      if let StagedData::Doc { documents } = &mut slot.data {
        documents.push(document);
      }
    })
  }
}

impl CheckpointWriter for DocWriter {
  fn port(&self) -> usize {
    self.port
  }

  fn data_model(&self) -> DataModel {
    DataModel::Doc
  }

  fn write_tuple(&mut self, tuple: Tuple) -> ActivityResult<()> {
    match single_value(tuple, DataModel::Doc)? {
      Value::Document(d) => self.write(d),
      other => Err(ActivityError::execution(format!(
        "DOC writer expects a document, got {}",
        other.value_type()
      ))),
    }
  }

  fn close(&mut self) -> ActivityResult<()> {
    close_slot(&self.slot)
  }

  fn written(&self) -> usize {
    written(&self.slot)
  }
}

/// Writer for a graph output. Edge endpoints are not checked here.
pub struct LpgWriter {
  port: usize,
  slot: Arc<Mutex<OutputSlot>>,
}

impl LpgWriter {
  pub(crate) fn new(port: usize, slot: Arc<Mutex<OutputSlot>>) -> Self {
    Self { port, slot }
  }

  pub fn write_node(&mut self, node: Node) -> ActivityResult<()> {
    with_open_slot(&self.slot, |slot| {
      if let StagedData::Lpg { nodes, .. } = &mut slot.data {
        nodes.push(node);
      }
    })
  }

  pub fn write_edge(&mut self, edge: Edge) -> ActivityResult<()> {
    with_open_slot(&self.slot, |slot| {
      if let StagedData::Lpg { edges, .. } = &mut slot.data {
        edges.push(edge);
      }
    })
  }
}

impl CheckpointWriter for LpgWriter {
  fn port(&self) -> usize {
    self.port
  }

  fn data_model(&self) -> DataModel {
    DataModel::Lpg
  }

  fn write_tuple(&mut self, tuple: Tuple) -> ActivityResult<()> {
    match single_value(tuple, DataModel::Lpg)? {
      Value::Node(n) => self.write_node(*n),
      Value::Edge(e) => self.write_edge(*e),
      other => Err(ActivityError::execution(format!(
        "LPG writer expects a node or edge, got {}",
        other.value_type()
      ))),
    }
  }

  fn close(&mut self) -> ActivityResult<()> {
    close_slot(&self.slot)
  }

  fn written(&self) -> usize {
    written(&self.slot)
  }
}
