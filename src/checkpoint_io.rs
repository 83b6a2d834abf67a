//! Checkpoint save/load as JSON files, and export of a run's committed outputs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::checkpoint::{Checkpoint, CheckpointKey};
use crate::error::ActivityResult;
use crate::executor::ExecutionReport;

/// Filename for the variables a run published.
pub const VARIABLES_FILENAME: &str = "variables.json";

/// Filename for the report of a run.
pub const REPORT_FILENAME: &str = "report.json";

/// Saves a checkpoint to `path` as JSON, creating parent directories.
#[instrument(level = "trace", skip(path, cp))]
pub fn save_checkpoint(path: &Path, cp: &Checkpoint) -> ActivityResult<()> {
  write_json(path, cp)
}

/// Loads a checkpoint from `path` and runs the storage integrity check on it.
#[instrument(level = "trace", skip(path))]
pub fn load_checkpoint(path: &Path) -> ActivityResult<Checkpoint> {
  let bytes = std::fs::read(path)?;
  let cp: Checkpoint = serde_json::from_slice(&bytes)?;
  cp.validate()?;
  Ok(cp)
}

/// `<activity type>-<activity id>-<port>.json`
pub fn checkpoint_filename(activity_type: &str, key: &CheckpointKey) -> String {
  format!("{}-{}-{}.json", activity_type, key.activity_id, key.port)
}

/// Writes `checkpoints` of one `activity_type` run to `dir`. On failure the files
/// already written by this call are removed again.
#[instrument(level = "trace", skip(checkpoints), fields(count = checkpoints.len()))]
pub fn export_outputs(
  dir: &Path,
  activity_type: &str,
  checkpoints: &[(CheckpointKey, Checkpoint)],
) -> ActivityResult<Vec<PathBuf>> {
  let mut written = vec![];
  for (key, cp) in checkpoints {
    let path = dir.join(checkpoint_filename(activity_type, key));
    if let Err(e) = save_checkpoint(&path, cp) {
      warn!(path = %path.display(), error = %e, "export failed");
      for done in &written {
        let _ = std::fs::remove_file(done);
      }
      return Err(e);
    }
    info!(path = %path.display(), records = cp.len(), "exported checkpoint");
    written.push(path);
  }
  Ok(written)
}

pub fn save_variables(path: &Path, variables: &BTreeMap<String, serde_json::Value>) -> ActivityResult<()> {
  write_json(path, variables)
}

pub fn load_variables(path: &Path) -> ActivityResult<BTreeMap<String, serde_json::Value>> {
  let bytes = std::fs::read(path)?;
  Ok(serde_json::from_slice(&bytes)?)
}

pub fn save_report(path: &Path, report: &ExecutionReport) -> ActivityResult<()> {
  write_json(path, report)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> ActivityResult<()> {
  let json = serde_json::to_string_pretty(value)?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, json)?;
  Ok(())
}
