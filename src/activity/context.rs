//! Execution context handed to an activity for one `execute`/`pipe` call.
//!
//! The context hands out writers lazily; creating a writer is what marks an output
//! port active. Everything written is staged until the executor commits the context
//! after a successful call. A failed call is discarded and leaves the store untouched.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, instrument};
use uuid::Uuid;

use super::{PortSpec, VariableStore};
use crate::checkpoint::{
  Checkpoint, CheckpointKey, CheckpointStore, CheckpointWriter, DocWriter, LpgWriter, OutputSlot,
  RelWriter, StagedData,
};
use crate::error::{ActivityError, ActivityResult};
use crate::pipe::CancellationToken;
use crate::types::{DataModel, Schema, Tuple, TypePreview};

pub struct ExecutionContext {
  activity_id: Uuid,
  outputs: Vec<PortSpec>,
  store: CheckpointStore,
  variables: VariableStore,
  cancel: CancellationToken,
  check_interval: usize,
  slots: BTreeMap<usize, Arc<Mutex<OutputSlot>>>,
}

impl ExecutionContext {
  pub fn new(
    activity_id: Uuid,
    outputs: Vec<PortSpec>,
    store: CheckpointStore,
    variables: VariableStore,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      activity_id,
      outputs,
      store,
      variables,
      cancel,
      check_interval: 1,
      slots: BTreeMap::new(),
    }
  }

  /// Rows between cancellation checks in [ExecutionContext::check_cancelled_at].
  pub fn with_check_interval(mut self, interval: usize) -> Self {
    self.check_interval = interval.max(1);
    self
  }

  pub fn activity_id(&self) -> Uuid {
    self.activity_id
  }

  pub fn output_ports(&self) -> &[PortSpec] {
    &self.outputs
  }

  fn claim_port(&mut self, port: usize, model: DataModel) -> ActivityResult<()> {
    let spec = self.outputs.get(port).ok_or_else(|| {
      ActivityError::execution(format!("output port {} is not declared", port))
    })?;
    if spec.model != model {
      return Err(ActivityError::type_mismatch(
        port,
        spec.model.to_string(),
        model.to_string(),
      ));
    }
    if self.slots.contains_key(&port) {
      return Err(ActivityError::execution(format!(
        "a writer for output port {} already exists",
        port
      )));
    }
    Ok(())
  }

  fn open_slot(&mut self, port: usize, data: StagedData) -> Arc<Mutex<OutputSlot>> {
    let slot = OutputSlot::new(port, data);
    self.slots.insert(port, Arc::clone(&slot));
    debug!(activity_id = %self.activity_id, port, "output port activated");
    slot
  }

  /// Relational writer for `port`. With `drop_existing` the committed output replaces
  /// any previous checkpoint of that port; otherwise rows are appended to it, which
  /// requires the schemas to match.
  pub fn create_rel_writer(
    &mut self,
    port: usize,
    schema: Schema,
    drop_existing: bool,
  ) -> ActivityResult<RelWriter> {
    self.claim_port(port, DataModel::Rel)?;
    let slot = self.open_slot(
      port,
      StagedData::Rel {
        schema: schema.clone(),
        tuples: vec![],
        drop_existing,
      },
    );
    Ok(RelWriter::new(port, schema, slot))
  }

  pub fn create_doc_writer(&mut self, port: usize) -> ActivityResult<DocWriter> {
    self.claim_port(port, DataModel::Doc)?;
    let slot = self.open_slot(port, StagedData::Doc { documents: vec![] });
    Ok(DocWriter::new(port, slot))
  }

  pub fn create_lpg_writer(&mut self, port: usize) -> ActivityResult<LpgWriter> {
    self.claim_port(port, DataModel::Lpg)?;
    let slot = self.open_slot(
      port,
      StagedData::Lpg {
        nodes: vec![],
        edges: vec![],
      },
    );
    Ok(LpgWriter::new(port, slot))
  }

  /// Writer matching a concrete locked type; used to drain the last stage of a pipe
  /// chain. A relational output always replaces the previous checkpoint.
  pub(crate) fn create_writer_for(
    &mut self,
    port: usize,
    locked: &TypePreview,
  ) -> ActivityResult<Box<dyn CheckpointWriter>> {
    match locked {
      TypePreview::Rel { schema, .. } => {
        Ok(Box::new(self.create_rel_writer(port, schema.clone(), true)?))
      }
      TypePreview::Doc { .. } => Ok(Box::new(self.create_doc_writer(port)?)),
      TypePreview::Lpg { .. } => Ok(Box::new(self.create_lpg_writer(port)?)),
      TypePreview::Unknown => Err(ActivityError::type_mismatch(
        port,
        self
          .outputs
          .get(port)
          .map(|p| p.model.to_string())
          .unwrap_or_default(),
        "UNKNOWN",
      )),
    }
  }

  pub fn variable_store(&self) -> &VariableStore {
    &self.variables
  }

  pub fn cancel_token(&self) -> &CancellationToken {
    &self.cancel
  }

  pub fn check_cancelled(&self) -> ActivityResult<()> {
    self.cancel.check()
  }

  /// Checks for cancellation every configured number of rows.
  pub fn check_cancelled_at(&self, row: usize) -> ActivityResult<()> {
    if row % self.check_interval == 0 {
      self.check_cancelled()
    } else {
      Ok(())
    }
  }

  /// Output ports a writer was created for, in port order.
  pub fn active_ports(&self) -> Vec<usize> {
    self.slots.keys().copied().collect()
  }

  /// Publishes every staged output, all-or-nothing. Returns records written per port.
  pub(crate) fn commit(self) -> ActivityResult<BTreeMap<usize, usize>> {
    self.prepare()?.apply()
  }

  /// Closes every writer and builds the validated checkpoints of this call without
  /// publishing them.
  #[instrument(level = "trace", skip(self), fields(activity_id = %self.activity_id))]
  pub(crate) fn prepare(self) -> ActivityResult<PendingCommit> {
    let mut batch = vec![];
    let mut rows = BTreeMap::new();
    for (port, slot) in &self.slots {
      let mut guard = slot
        .lock()
        .map_err(|_| ActivityError::storage("output slot lock poisoned"))?;
      guard.closed = true;
      rows.insert(*port, guard.written);
      let key = CheckpointKey::new(self.activity_id, *port);
      let checkpoint = match &mut guard.data {
        StagedData::Rel {
          schema,
          tuples,
          drop_existing,
        } => {
          let staged = std::mem::take(tuples);
          if *drop_existing {
            Checkpoint::rel(schema.clone(), staged)
          } else {
            self.append_to_existing(key, schema, staged)?
          }
        }
        StagedData::Doc { documents } => Checkpoint::doc(std::mem::take(documents)),
        StagedData::Lpg { nodes, edges } => {
          Checkpoint::lpg(std::mem::take(nodes), std::mem::take(edges))
        }
      };
      checkpoint
        .validate()
        .map_err(|e| ActivityError::storage(format!("checkpoint {} rejected: {}", key, e)))?;
      batch.push((key, checkpoint));
    }
    Ok(PendingCommit {
      store: self.store.clone(),
      checkpoints: batch,
      rows,
    })
  }

  fn append_to_existing(
    &self,
    key: CheckpointKey,
    schema: &Schema,
    staged: Vec<Tuple>,
  ) -> ActivityResult<Checkpoint> {
    match self.store.get(&key)? {
      None => Ok(Checkpoint::rel(schema.clone(), staged)),
      Some(Checkpoint::Rel(existing)) if existing.schema == *schema => {
        let mut tuples = existing.tuples.clone();
        tuples.extend(staged);
        Ok(Checkpoint::rel(schema.clone(), tuples))
      }
      Some(Checkpoint::Rel(existing)) => Err(ActivityError::storage(format!(
        "cannot append to {}: schema {} differs from {}",
        key, existing.schema, schema
      ))),
      Some(other) => Err(ActivityError::storage(format!(
        "cannot append relational rows to {} checkpoint {}",
        other.data_model(),
        key
      ))),
    }
  }

  /// Drops everything staged; writers still held by the activity reject further writes.
  pub(crate) fn discard(self) {
    for slot in self.slots.values() {
      if let Ok(mut guard) = slot.lock() {
        guard.closed = true;
      }
    }
    debug!(activity_id = %self.activity_id, "staged outputs discarded");
  }
}

/// Validated outputs of one call, not yet visible in the store.
pub(crate) struct PendingCommit {
  store: CheckpointStore,
  checkpoints: Vec<(CheckpointKey, Checkpoint)>,
  rows: BTreeMap<usize, usize>,
}

impl PendingCommit {
  pub(crate) fn checkpoints(&self) -> &[(CheckpointKey, Checkpoint)] {
    &self.checkpoints
  }

  /// Makes every checkpoint visible at once. Returns records written per port.
  pub(crate) fn apply(self) -> ActivityResult<BTreeMap<usize, usize>> {
    self.store.commit(self.checkpoints)?;
    Ok(self.rows)
  }
}
