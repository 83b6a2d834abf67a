//! Engine configuration: JSON file plus environment overrides.
//!
//! Environment variables win over the file (and over CLI flags, which the binary folds
//! in before calling [EngineConfig::apply_env]):
//! - `POLYWEAVE_PIPE_CAPACITY`: bounded channel capacity between pipe stages
//! - `POLYWEAVE_CHECKPOINT_DIR`: directory where committed outputs are exported as JSON

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{ActivityError, ActivityResult};

pub const ENV_PIPE_CAPACITY: &str = "POLYWEAVE_PIPE_CAPACITY";
pub const ENV_CHECKPOINT_DIR: &str = "POLYWEAVE_CHECKPOINT_DIR";

fn default_pipe_capacity() -> usize {
  1
}

fn default_cancel_check_interval() -> usize {
  1
}

/// Runtime knobs of the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
  /// Capacity of every pipe channel. At least 1.
  #[serde(default = "default_pipe_capacity")]
  pub pipe_capacity: usize,
  /// Where to export committed outputs; `None` keeps them in memory only.
  #[serde(default)]
  pub checkpoint_dir: Option<PathBuf>,
  /// Rows between cooperative cancellation checks in source loops.
  #[serde(default = "default_cancel_check_interval")]
  pub cancel_check_interval: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      pipe_capacity: default_pipe_capacity(),
      checkpoint_dir: None,
      cancel_check_interval: default_cancel_check_interval(),
    }
  }
}

impl EngineConfig {
  /// Reads and validates a JSON config file. Missing keys take their defaults.
  #[instrument(level = "trace")]
  pub fn from_json_file(path: &Path) -> ActivityResult<Self> {
    let json = std::fs::read_to_string(path)?;
    let config: EngineConfig = serde_json::from_str(&json)?;
    config.validate()?;
    Ok(config)
  }

  /// Applies `POLYWEAVE_*` overrides from the process environment.
  pub fn apply_env(self) -> ActivityResult<Self> {
    self.apply_env_with(|key| std::env::var(key).ok())
  }

  /// Applies overrides from `lookup` (the process environment in production).
  pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> ActivityResult<Self> {
    if let Some(raw) = lookup(ENV_PIPE_CAPACITY) {
      self.pipe_capacity = raw.trim().parse().map_err(|_| {
        ActivityError::settings(ENV_PIPE_CAPACITY, format!("'{}' is not a positive integer", raw))
      })?;
    }
    if let Some(dir) = lookup(ENV_CHECKPOINT_DIR).filter(|d| !d.is_empty()) {
      self.checkpoint_dir = Some(PathBuf::from(dir));
    }
    self.validate()?;
    info!(
      pipe_capacity = self.pipe_capacity,
      checkpoint_dir = ?self.checkpoint_dir,
      "engine config"
    );
    Ok(self)
  }

  pub fn validate(&self) -> ActivityResult<()> {
    if self.pipe_capacity == 0 {
      return Err(ActivityError::settings("pipe_capacity", "must be at least 1"));
    }
    if self.cancel_check_interval == 0 {
      return Err(ActivityError::settings(
        "cancel_check_interval",
        "must be at least 1",
      ));
    }
    Ok(())
  }
}
