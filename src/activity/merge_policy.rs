//! Partial-activation policy: decides from the upstream branch states whether an
//! activity runs and produces output.

use serde::{Deserialize, Serialize};

use crate::error::{ActivityError, ActivityResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataStateMerger {
  /// Every input branch must be active.
  #[default]
  And,
  /// At least one input branch must be active; inactive ones are skipped.
  Or,
}

impl DataStateMerger {
  /// Whether the activity produces output given which inputs are active.
  /// An activity without inputs always produces.
  pub fn merge(&self, active: &[bool]) -> bool {
    if active.is_empty() {
      return true;
    }
    match self {
      DataStateMerger::And => active.iter().all(|a| *a),
      DataStateMerger::Or => active.iter().any(|a| *a),
    }
  }

  /// Rejects input states the policy does not absorb: under `And` the first inactive
  /// input is an `InputFailure`; under `Or` nothing is an error.
  pub fn admit(&self, active: &[bool]) -> ActivityResult<()> {
    match self {
      DataStateMerger::And => match active.iter().position(|a| !*a) {
        Some(port) => Err(ActivityError::input_failure(
          port,
          "upstream branch produced no data",
        )),
        None => Ok(()),
      },
      DataStateMerger::Or => Ok(()),
    }
  }

  pub fn tolerates_inactive_inputs(&self) -> bool {
    matches!(self, DataStateMerger::Or)
  }
}
