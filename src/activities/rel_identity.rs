//! Relational passthrough. Pipe only.

use std::sync::OnceLock;

use async_trait::async_trait;
use tracing::trace;

use super::single_input;
use crate::activity::{Activity, ActivityCategory, ActivityDescriptor, Pipeable, PortSpec};
use crate::error::ActivityResult;
use crate::pipe::{CancellationToken, InputPipe, OutputPipe};
use crate::types::{DataModel, Settings, SettingsPreview, TypePreview};

pub const ACTIVITY_TYPE: &str = "relIdentity";

fn descriptor() -> &'static ActivityDescriptor {
  static D: OnceLock<ActivityDescriptor> = OnceLock::new();
  D.get_or_init(|| {
    ActivityDescriptor::new(ACTIVITY_TYPE, "Relational identity")
      .category(ActivityCategory::Transform)
      .input(PortSpec::single("in", DataModel::Rel))
      .output(PortSpec::single("out", DataModel::Rel))
  })
}

#[derive(Default)]
pub struct RelIdentity;

pub fn create() -> Box<dyn Activity> {
  Box::new(RelIdentity)
}

impl Activity for RelIdentity {
  fn descriptor(&self) -> &ActivityDescriptor {
    descriptor()
  }

  fn preview_out_types(
    &self,
    inputs: &[TypePreview],
    _settings: &SettingsPreview,
  ) -> ActivityResult<Vec<TypePreview>> {
    let input = single_input(inputs, DataModel::Rel)?;
    Ok(vec![input.clone()])
  }

  fn as_pipeable(&mut self) -> Option<&mut dyn Pipeable> {
    Some(self)
  }
}

#[async_trait]
impl Pipeable for RelIdentity {
  fn lock_output_type(
    &self,
    inputs: &[TypePreview],
    _settings: &Settings,
  ) -> ActivityResult<TypePreview> {
    let input = single_input(inputs, DataModel::Rel)?;
    input.require_model(0, DataModel::Rel)?;
    Ok(input.clone())
  }

  async fn pipe(
    &mut self,
    mut inputs: Vec<InputPipe>,
    mut output: OutputPipe,
    _settings: &Settings,
    _cancel: &CancellationToken,
  ) -> ActivityResult<()> {
    let Some(mut input) = inputs.pop() else {
      return Ok(());
    };
    while let Some(tuple) = input.next().await? {
      trace!(?tuple, "relIdentity forward");
      output.put(tuple).await?;
    }
    Ok(())
  }
}
