//! Constant relational source: always the same three rows.

use std::sync::OnceLock;

use async_trait::async_trait;
use tracing::{info, instrument, trace};

use crate::activity::{
  Activity, ActivityCategory, ActivityDescriptor, BatchActivity, ExecutionContext, InputReaders,
  Pipeable, PortSpec,
};
use crate::checkpoint::CheckpointWriter;
use crate::error::ActivityResult;
use crate::pipe::{CancellationToken, InputPipe, OutputPipe};
use crate::types::{
  DataModel, Field, Schema, Settings, SettingsPreview, Tuple, TypePreview, Value, ValueType,
};

pub const ACTIVITY_TYPE: &str = "relValues";

fn descriptor() -> &'static ActivityDescriptor {
  static D: OnceLock<ActivityDescriptor> = OnceLock::new();
  D.get_or_init(|| {
    ActivityDescriptor::new(ACTIVITY_TYPE, "Constant rows")
      .category(ActivityCategory::Source)
      .output(PortSpec::single("rows", DataModel::Rel))
  })
}

/// `(id INTEGER NOT NULL, name STRING, age INTEGER)`.
pub fn values_schema() -> ActivityResult<Schema> {
  Schema::new(vec![
    Field::new("id", ValueType::Integer).not_null(),
    Field::new("name", ValueType::String),
    Field::new("age", ValueType::Integer),
  ])
}

pub fn values_rows() -> Vec<Tuple> {
  [(1_i64, "Alice", 34_i64), (2, "Bob", 27), (3, "Carol", 45)]
    .into_iter()
    .map(|(id, name, age)| vec![Value::from(id), Value::from(name), Value::from(age)])
    .collect()
}

/// Source activity emitting [values_rows]; its preview ignores inputs and settings.
#[derive(Default)]
pub struct RelValues;

pub fn create() -> Box<dyn Activity> {
  Box::new(RelValues)
}

impl Activity for RelValues {
  fn descriptor(&self) -> &ActivityDescriptor {
    descriptor()
  }

  fn preview_out_types(
    &self,
    _inputs: &[TypePreview],
    _settings: &SettingsPreview,
  ) -> ActivityResult<Vec<TypePreview>> {
    Ok(vec![TypePreview::rel(values_schema()?)])
  }

  fn as_batch(&mut self) -> Option<&mut dyn BatchActivity> {
    Some(self)
  }

  fn as_pipeable(&mut self) -> Option<&mut dyn Pipeable> {
    Some(self)
  }
}

#[async_trait]
impl BatchActivity for RelValues {
  #[instrument(level = "trace", skip_all)]
  async fn execute(
    &mut self,
    _inputs: InputReaders,
    _settings: &Settings,
    ctx: &mut ExecutionContext,
  ) -> ActivityResult<()> {
    let mut writer = ctx.create_rel_writer(0, values_schema()?, true)?;
    for (row, tuple) in values_rows().into_iter().enumerate() {
      ctx.check_cancelled_at(row)?;
      writer.write(tuple)?;
    }
    writer.close()?;
    info!(rows = writer.written(), "relValues wrote rows");
    Ok(())
  }
}

#[async_trait]
impl Pipeable for RelValues {
  fn lock_output_type(
    &self,
    _inputs: &[TypePreview],
    _settings: &Settings,
  ) -> ActivityResult<TypePreview> {
    Ok(TypePreview::rel(values_schema()?))
  }

  async fn pipe(
    &mut self,
    _inputs: Vec<InputPipe>,
    mut output: OutputPipe,
    _settings: &Settings,
    cancel: &CancellationToken,
  ) -> ActivityResult<()> {
    for tuple in values_rows() {
      cancel.check()?;
      trace!(?tuple, "relValues put");
      output.put(tuple).await?;
    }
    Ok(())
  }
}
