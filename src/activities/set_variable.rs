//! Writes one run variable from its settings.

use std::sync::OnceLock;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::activity::{
  Activity, ActivityCategory, ActivityDescriptor, ExecutionContext, InputReaders, SettingKind,
  SettingSpec, VariableScope, VariableWriter,
};
use crate::error::ActivityResult;
use crate::types::{Settings, SettingsPreview, TypePreview};

pub const ACTIVITY_TYPE: &str = "setVariable";
pub const NAME: &str = "name";
pub const VALUE: &str = "value";

fn descriptor() -> &'static ActivityDescriptor {
  static D: OnceLock<ActivityDescriptor> = OnceLock::new();
  D.get_or_init(|| {
    ActivityDescriptor::new(ACTIVITY_TYPE, "Set variable")
      .category(ActivityCategory::Variables)
      .setting(
        SettingSpec::new(
          NAME,
          "Variable name",
          SettingKind::String {
            min_len: 1,
            max_len: Some(64),
          },
        )
        .required(),
      )
      .setting(SettingSpec::new(VALUE, "Value", SettingKind::Json).with_default(json!(null)))
  })
}

#[derive(Default)]
pub struct SetVariable;

pub fn create() -> Box<dyn Activity> {
  Box::new(SetVariable)
}

impl Activity for SetVariable {
  fn descriptor(&self) -> &ActivityDescriptor {
    descriptor()
  }

  fn preview_out_types(
    &self,
    _inputs: &[TypePreview],
    _settings: &SettingsPreview,
  ) -> ActivityResult<Vec<TypePreview>> {
    Ok(vec![])
  }

  fn as_variable_writer(&mut self) -> Option<&mut dyn VariableWriter> {
    Some(self)
  }
}

#[async_trait]
impl VariableWriter for SetVariable {
  async fn execute(
    &mut self,
    _inputs: InputReaders,
    settings: &Settings,
    ctx: &mut ExecutionContext,
    variables: &mut VariableScope,
  ) -> ActivityResult<()> {
    ctx.check_cancelled()?;
    let name = settings.get_string(NAME)?;
    let value = settings.get_json(VALUE)?;
    info!(variable = name, "setVariable");
    variables.set(name, value);
    Ok(())
  }
}
