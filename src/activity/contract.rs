//! The activity contract: a base capability every activity implements, plus optional
//! capabilities the executor queries at runtime.

use async_trait::async_trait;
use serde::Serialize;

use super::{ActivityDescriptor, ExecutionContext, VariableScope};
use crate::checkpoint::CheckpointReader;
use crate::error::ActivityResult;
use crate::pipe::{CancellationToken, InputPipe, OutputPipe};
use crate::types::{Settings, SettingsPreview, TypePreview};

/// One optional reader per input port; `None` marks an inactive upstream branch.
pub type InputReaders = Vec<Option<Box<dyn CheckpointReader>>>;

/// Base capability.
pub trait Activity: Send + Sync {
  fn descriptor(&self) -> &ActivityDescriptor;

  fn activity_type(&self) -> &str {
    &self.descriptor().activity_type
  }

  /// Output types for the given input types and (partially known) settings, one per
  /// output port.
  ///
  /// Must be pure and idempotent, and monotonic: replacing an `Unknown` input by a
  /// concrete type may only make outputs more specific. Fails with `TypeMismatch` when
  /// an input's model does not fit its port.
  fn preview_out_types(
    &self,
    inputs: &[TypePreview],
    settings: &SettingsPreview,
  ) -> ActivityResult<Vec<TypePreview>>;

  /// Clears per-run state before the activity is run again.
  fn reset(&mut self) {}

  fn as_batch(&mut self) -> Option<&mut dyn BatchActivity> {
    None
  }

  fn as_pipeable(&mut self) -> Option<&mut dyn Pipeable> {
    None
  }

  fn as_variable_writer(&mut self) -> Option<&mut dyn VariableWriter> {
    None
  }

  fn capabilities(&mut self) -> Capabilities {
    Capabilities {
      batch: self.as_batch().is_some(),
      pipe: self.as_pipeable().is_some(),
      variables: self.as_variable_writer().is_some(),
    }
  }
}

/// Which optional capabilities an activity offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
  pub batch: bool,
  pub pipe: bool,
  pub variables: bool,
}

/// Materialize-then-write execution.
#[async_trait]
pub trait BatchActivity: Send {
  /// Reads the active inputs and writes outputs through writers taken from `ctx`.
  async fn execute(
    &mut self,
    inputs: InputReaders,
    settings: &Settings,
    ctx: &mut ExecutionContext,
  ) -> ActivityResult<()>;
}

/// Row-at-a-time execution inside a pipe chain.
///
/// Activities that must tolerate an inactive input (OR merges) cannot be pipeable: a
/// pipe stage has no way to skip an input without failing the chain.
#[async_trait]
pub trait Pipeable: Send {
  /// The concrete output type for concrete inputs. Called once before data flows.
  fn lock_output_type(
    &self,
    inputs: &[TypePreview],
    settings: &Settings,
  ) -> ActivityResult<TypePreview>;

  /// Pulls from `inputs` and puts onto `output` until the inputs are exhausted.
  /// Returning drops `output`, which ends the downstream stream.
  async fn pipe(
    &mut self,
    inputs: Vec<InputPipe>,
    output: OutputPipe,
    settings: &Settings,
    cancel: &CancellationToken,
  ) -> ActivityResult<()>;
}

/// Batch execution with an extra handle on the run's variables.
#[async_trait]
pub trait VariableWriter: Send {
  async fn execute(
    &mut self,
    inputs: InputReaders,
    settings: &Settings,
    ctx: &mut ExecutionContext,
    variables: &mut VariableScope,
  ) -> ActivityResult<()>;
}
