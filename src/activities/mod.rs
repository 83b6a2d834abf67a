//! Built-in activities.

mod doc_merge;
#[cfg(test)]
mod doc_merge_test;
mod lpg_identity;
#[cfg(test)]
mod lpg_identity_test;
mod lpg_merge;
#[cfg(test)]
mod lpg_merge_test;
mod rel_identity;
#[cfg(test)]
mod rel_identity_test;
mod rel_limit;
mod rel_values;
mod set_variable;
#[cfg(test)]
mod set_variable_test;

pub use doc_merge::DocMerge;
pub use lpg_identity::LpgIdentity;
pub use lpg_merge::LpgMerge;
pub use rel_identity::RelIdentity;
pub use rel_limit::RelLimit;
pub use rel_values::{RelValues, values_rows, values_schema};
pub use set_variable::SetVariable;

use crate::activity::ActivityFactory;
use crate::error::{ActivityError, ActivityResult};
use crate::types::{DataModel, TypePreview};

/// Factories of every built-in activity, in registration order.
pub fn builtin_factories() -> Vec<ActivityFactory> {
  vec![
    rel_values::create as ActivityFactory,
    rel_identity::create,
    rel_limit::create,
    doc_merge::create,
    lpg_merge::create,
    lpg_identity::create,
    set_variable::create,
  ]
}

/// The only input of a one-input activity, checked against `model`.
pub(crate) fn single_input(inputs: &[TypePreview], model: DataModel) -> ActivityResult<&TypePreview> {
  match inputs {
    [input] => {
      input.expect_model(0, model)?;
      Ok(input)
    }
    _ => Err(ActivityError::execution(format!(
      "expected one {} input, got {}",
      model,
      inputs.len()
    ))),
  }
}
