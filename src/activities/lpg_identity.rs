//! Graph passthrough, in batch (node pass, then edge pass) or as a pipe stage.

use std::sync::OnceLock;

use async_trait::async_trait;
use tracing::{info, instrument, trace};

use super::single_input;
use crate::activity::{
  Activity, ActivityCategory, ActivityDescriptor, BatchActivity, ExecutionContext, InputReaders,
  Pipeable, PortSpec,
};
use crate::checkpoint::CheckpointWriter;
use crate::error::{ActivityError, ActivityResult};
use crate::pipe::{CancellationToken, InputPipe, OutputPipe};
use crate::types::{DataModel, Settings, SettingsPreview, TypePreview};

pub const ACTIVITY_TYPE: &str = "lpgIdentity";

fn descriptor() -> &'static ActivityDescriptor {
  static D: OnceLock<ActivityDescriptor> = OnceLock::new();
  D.get_or_init(|| {
    ActivityDescriptor::new(ACTIVITY_TYPE, "Graph identity")
      .category(ActivityCategory::Transform)
      .category(ActivityCategory::Graph)
      .input(PortSpec::single("in", DataModel::Lpg))
      .output(PortSpec::single("out", DataModel::Lpg))
  })
}

#[derive(Default)]
pub struct LpgIdentity;

pub fn create() -> Box<dyn Activity> {
  Box::new(LpgIdentity)
}

impl Activity for LpgIdentity {
  fn descriptor(&self) -> &ActivityDescriptor {
    descriptor()
  }

  fn preview_out_types(
    &self,
    inputs: &[TypePreview],
    _settings: &SettingsPreview,
  ) -> ActivityResult<Vec<TypePreview>> {
    Ok(vec![single_input(inputs, DataModel::Lpg)?.clone()])
  }

  fn as_batch(&mut self) -> Option<&mut dyn BatchActivity> {
    Some(self)
  }

  fn as_pipeable(&mut self) -> Option<&mut dyn Pipeable> {
    Some(self)
  }
}

#[async_trait]
impl BatchActivity for LpgIdentity {
  #[instrument(level = "trace", skip_all)]
  async fn execute(
    &mut self,
    inputs: InputReaders,
    _settings: &Settings,
    ctx: &mut ExecutionContext,
  ) -> ActivityResult<()> {
    let Some(Some(reader)) = inputs.first() else {
      return Err(ActivityError::input_failure(0, "graph input is not active"));
    };
    let graph = reader.as_lpg().ok_or_else(|| {
      ActivityError::type_mismatch(0, "LPG", reader.data_model().to_string())
    })?;
    let mut writer = ctx.create_lpg_writer(0)?;
    for (row, node) in graph.nodes().enumerate() {
      ctx.check_cancelled_at(row)?;
      writer.write_node(node.clone())?;
    }
    for (row, edge) in graph.edges().enumerate() {
      ctx.check_cancelled_at(row)?;
      writer.write_edge(edge.clone())?;
    }
    writer.close()?;
    info!(
      nodes = graph.node_count(),
      edges = graph.edge_count(),
      "lpgIdentity copied graph"
    );
    Ok(())
  }
}

#[async_trait]
impl Pipeable for LpgIdentity {
  fn lock_output_type(
    &self,
    inputs: &[TypePreview],
    _settings: &Settings,
  ) -> ActivityResult<TypePreview> {
    let input = single_input(inputs, DataModel::Lpg)?;
    input.require_model(0, DataModel::Lpg)?;
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
      trace!("lpgIdentity forward");
      output.put(tuple).await?;
    }
    Ok(())
  }
}
