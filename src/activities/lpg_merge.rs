//! Merges graph inputs: one node pass over every active input, then one edge pass.
//! The first node (and the first edge) seen for an id wins. OR merge.

use std::collections::HashSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::activity::{
  Activity, ActivityCategory, ActivityDescriptor, BatchActivity, DataStateMerger,
  ExecutionContext, InputReaders, PortSpec,
};
use crate::checkpoint::LpgReader;
use crate::error::{ActivityError, ActivityResult};
use crate::types::{DataModel, Settings, SettingsPreview, TypePreview, union_lpg};

pub const ACTIVITY_TYPE: &str = "lpgMerge";

fn descriptor() -> &'static ActivityDescriptor {
  static D: OnceLock<ActivityDescriptor> = OnceLock::new();
  D.get_or_init(|| {
    ActivityDescriptor::new(ACTIVITY_TYPE, "Merge graphs")
      .category(ActivityCategory::Merge)
      .category(ActivityCategory::Graph)
      .input(PortSpec::one_or_more("in", DataModel::Lpg))
      .output(PortSpec::single("out", DataModel::Lpg))
      .merge_policy(DataStateMerger::Or)
  })
}

#[derive(Default)]
pub struct LpgMerge;

pub fn create() -> Box<dyn Activity> {
  Box::new(LpgMerge)
}

impl Activity for LpgMerge {
  fn descriptor(&self) -> &ActivityDescriptor {
    descriptor()
  }

  fn preview_out_types(
    &self,
    inputs: &[TypePreview],
    _settings: &SettingsPreview,
  ) -> ActivityResult<Vec<TypePreview>> {
    Ok(vec![union_lpg(inputs)?])
  }

  fn as_batch(&mut self) -> Option<&mut dyn BatchActivity> {
    Some(self)
  }
}

#[async_trait]
impl BatchActivity for LpgMerge {
  #[instrument(level = "trace", skip_all, fields(inputs = inputs.len()))]
  async fn execute(
    &mut self,
    inputs: InputReaders,
    _settings: &Settings,
    ctx: &mut ExecutionContext,
  ) -> ActivityResult<()> {
    let mut graphs: Vec<&LpgReader> = vec![];
    for (port, reader) in inputs.iter().enumerate() {
      if let Some(reader) = reader {
        graphs.push(reader.as_lpg().ok_or_else(|| {
          ActivityError::type_mismatch(port, "LPG", reader.data_model().to_string())
        })?);
      }
    }
    if graphs.is_empty() {
      debug!("lpgMerge has no active input");
      return Ok(());
    }
    let mut writer = ctx.create_lpg_writer(0)?;

    let mut node_ids = HashSet::new();
    let mut row = 0;
    for graph in &graphs {
      for node in graph.nodes() {
        ctx.check_cancelled_at(row)?;
        row += 1;
        if node_ids.insert(node.id.as_str()) {
          writer.write_node(node.clone())?;
        }
      }
    }

    let mut edge_ids = HashSet::new();
    for graph in &graphs {
      for edge in graph.edges() {
        ctx.check_cancelled_at(row)?;
        row += 1;
        if edge_ids.insert(edge.id.as_str()) {
          writer.write_edge(edge.clone())?;
        }
      }
    }
    info!(
      active = graphs.len(),
      nodes = node_ids.len(),
      edges = edge_ids.len(),
      "lpgMerge finished"
    );
    Ok(())
  }
}
