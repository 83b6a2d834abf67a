//! In-process checkpoint store shared by all activities of one workflow run.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{instrument, trace};

use super::{Checkpoint, CheckpointKey, CheckpointReader};
use crate::error::{ActivityError, ActivityResult};

/// Committed checkpoints keyed by activity output port. Cloning shares the store.
#[derive(Debug, Clone, Default)]
pub struct CheckpointStore {
  inner: Arc<RwLock<HashMap<CheckpointKey, Checkpoint>>>,
}

impl CheckpointStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn poisoned() -> ActivityError {
    ActivityError::storage("checkpoint store lock poisoned")
  }

  pub fn get(&self, key: &CheckpointKey) -> ActivityResult<Option<Checkpoint>> {
    let map = self.inner.read().map_err(|_| Self::poisoned())?;
    Ok(map.get(key).cloned())
  }

  /// A read handle for `key`, or `None` when that port produced no checkpoint.
  pub fn reader(&self, key: &CheckpointKey) -> ActivityResult<Option<Box<dyn CheckpointReader>>> {
    Ok(self.get(key)?.map(|cp| cp.reader()))
  }

  pub fn contains(&self, key: &CheckpointKey) -> bool {
    self
      .inner
      .read()
      .map(|m| m.contains_key(key))
      .unwrap_or(false)
  }

  /// Validates and stores a single checkpoint, replacing any previous one.
  pub fn put(&self, key: CheckpointKey, checkpoint: Checkpoint) -> ActivityResult<()> {
    self.commit(vec![(key, checkpoint)])
  }

  /// Stores a batch all-or-nothing: if any checkpoint fails validation none of them
  /// becomes visible.
  #[instrument(level = "trace", skip(self, batch), fields(count = batch.len()))]
  pub fn commit(&self, batch: Vec<(CheckpointKey, Checkpoint)>) -> ActivityResult<()> {
    for (key, cp) in &batch {
      cp.validate()
        .map_err(|e| ActivityError::storage(format!("checkpoint {} rejected: {}", key, e)))?;
    }
    let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
    for (key, cp) in batch {
      trace!(checkpoint = %key, records = cp.len(), "committing checkpoint");
      map.insert(key, cp);
    }
    Ok(())
  }

  pub fn remove(&self, key: &CheckpointKey) -> ActivityResult<Option<Checkpoint>> {
    let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
    Ok(map.remove(key))
  }

  /// All keys, sorted for stable output.
  pub fn keys(&self) -> Vec<CheckpointKey> {
    let mut keys: Vec<CheckpointKey> = self
      .inner
      .read()
      .map(|m| m.keys().copied().collect())
      .unwrap_or_default();
    keys.sort_by_key(|k| (k.activity_id, k.port));
    keys
  }

  pub fn len(&self) -> usize {
    self.inner.read().map(|m| m.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
