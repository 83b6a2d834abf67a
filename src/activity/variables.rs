//! Variable store shared by a workflow run, and the per-execution scope variable
//! writers fill.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::error::{ActivityError, ActivityResult};

/// Run-wide key to JSON value map. Cloning shares the store.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
  inner: Arc<RwLock<BTreeMap<String, serde_json::Value>>>,
}

impl VariableStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<serde_json::Value> {
    self.inner.read().ok().and_then(|m| m.get(key).cloned())
  }

  pub fn snapshot(&self) -> BTreeMap<String, serde_json::Value> {
    self
      .inner
      .read()
      .map(|m| m.clone())
      .unwrap_or_default()
  }

  pub fn len(&self) -> usize {
    self.inner.read().map(|m| m.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Publishes everything a scope collected. Later entries replace earlier ones.
  pub(crate) fn publish(&self, scope: VariableScope) -> ActivityResult<()> {
    let mut map = self
      .inner
      .write()
      .map_err(|_| ActivityError::storage("variable store lock poisoned"))?;
    for (key, value) in scope.entries {
      trace!(variable = %key, "publishing variable");
      map.insert(key, value);
    }
    Ok(())
  }
}

/// Writes made by one variable-writer execution. Published to the run's store only
/// when the execution succeeds; last write per key wins.
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
  entries: BTreeMap<String, serde_json::Value>,
}

impl VariableScope {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
    self.entries.insert(key.into(), value);
  }

  pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
    self.entries.get(key)
  }

  pub fn entries(&self) -> &BTreeMap<String, serde_json::Value> {
    &self.entries
  }
}
