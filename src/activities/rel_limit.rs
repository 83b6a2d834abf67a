//! Forwards the first `limit` rows of its input.
//!
//! The emitted-row counter lives on the activity, so a second run without `reset`
//! forwards nothing. Rows past the limit are still pulled so the upstream stage can
//! finish.

use std::sync::OnceLock;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, trace};

use super::single_input;
use crate::activity::{
  Activity, ActivityCategory, ActivityDescriptor, Pipeable, PortSpec, SettingKind, SettingSpec,
};
use crate::error::{ActivityError, ActivityResult};
use crate::pipe::{CancellationToken, InputPipe, OutputPipe};
use crate::types::{DataModel, Settings, SettingsPreview, TypePreview};

pub const ACTIVITY_TYPE: &str = "relLimit";
pub const LIMIT: &str = "limit";

fn descriptor() -> &'static ActivityDescriptor {
  static D: OnceLock<ActivityDescriptor> = OnceLock::new();
  D.get_or_init(|| {
    ActivityDescriptor::new(ACTIVITY_TYPE, "Limit rows")
      .category(ActivityCategory::Transform)
      .input(PortSpec::single("in", DataModel::Rel))
      .output(PortSpec::single("out", DataModel::Rel))
      .setting(
        SettingSpec::new(
          LIMIT,
          "Row limit",
          SettingKind::Integer {
            min: Some(0),
            max: None,
          },
        )
        .with_default(json!(10)),
      )
  })
}

#[derive(Default)]
pub struct RelLimit {
  emitted: usize,
}

pub fn create() -> Box<dyn Activity> {
  Box::new(RelLimit::default())
}

impl RelLimit {
  pub fn emitted(&self) -> usize {
    self.emitted
  }
}

impl Activity for RelLimit {
  fn descriptor(&self) -> &ActivityDescriptor {
    descriptor()
  }

  fn preview_out_types(
    &self,
    inputs: &[TypePreview],
    _settings: &SettingsPreview,
  ) -> ActivityResult<Vec<TypePreview>> {
    Ok(vec![single_input(inputs, DataModel::Rel)?.clone()])
  }

  fn reset(&mut self) {
    debug!(emitted = self.emitted, "relLimit reset");
    self.emitted = 0;
  }

  fn as_pipeable(&mut self) -> Option<&mut dyn Pipeable> {
    Some(self)
  }
}

#[async_trait]
impl Pipeable for RelLimit {
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
    settings: &Settings,
    _cancel: &CancellationToken,
  ) -> ActivityResult<()> {
    let limit = usize::try_from(settings.get_integer(LIMIT)?)
      .map_err(|_| ActivityError::settings(LIMIT, "must not be negative"))?;
    let Some(mut input) = inputs.pop() else {
      return Ok(());
    };
    while let Some(tuple) = input.next().await? {
      if self.emitted < limit {
        output.put(tuple).await?;
        self.emitted += 1;
      } else {
        trace!("relLimit dropping row past limit");
      }
    }
    debug!(emitted = self.emitted, received = input.received(), "relLimit finished");
    Ok(())
  }
}
