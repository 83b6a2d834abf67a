//! Concatenates the documents of every active input. OR merge: inactive inputs are
//! skipped, and no output is created when none is active.

use std::sync::OnceLock;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::activity::{
  Activity, ActivityCategory, ActivityDescriptor, BatchActivity, DataStateMerger,
  ExecutionContext, InputReaders, PortSpec,
};
use crate::checkpoint::{CheckpointWriter, DocReader};
use crate::error::{ActivityError, ActivityResult};
use crate::types::{DataModel, Settings, SettingsPreview, TypePreview, union_doc};

pub const ACTIVITY_TYPE: &str = "docMerge";

fn descriptor() -> &'static ActivityDescriptor {
  static D: OnceLock<ActivityDescriptor> = OnceLock::new();
  D.get_or_init(|| {
    ActivityDescriptor::new(ACTIVITY_TYPE, "Merge documents")
      .category(ActivityCategory::Merge)
      .input(PortSpec::one_or_more("in", DataModel::Doc))
      .output(PortSpec::single("out", DataModel::Doc))
      .merge_policy(DataStateMerger::Or)
  })
}

#[derive(Default)]
pub struct DocMerge;

pub fn create() -> Box<dyn Activity> {
  Box::new(DocMerge)
}

impl Activity for DocMerge {
  fn descriptor(&self) -> &ActivityDescriptor {
    descriptor()
  }

  fn preview_out_types(
    &self,
    inputs: &[TypePreview],
    _settings: &SettingsPreview,
  ) -> ActivityResult<Vec<TypePreview>> {
    Ok(vec![union_doc(inputs)?])
  }

  fn as_batch(&mut self) -> Option<&mut dyn BatchActivity> {
    Some(self)
  }
}

#[async_trait]
impl BatchActivity for DocMerge {
  #[instrument(level = "trace", skip_all, fields(inputs = inputs.len()))]
  async fn execute(
    &mut self,
    inputs: InputReaders,
    _settings: &Settings,
    ctx: &mut ExecutionContext,
  ) -> ActivityResult<()> {
    let mut active: Vec<&DocReader> = vec![];
    for (port, reader) in inputs.iter().enumerate() {
      if let Some(reader) = reader {
        active.push(reader.as_doc().ok_or_else(|| {
          ActivityError::type_mismatch(port, "DOC", reader.data_model().to_string())
        })?);
      }
    }
    if active.is_empty() {
      debug!("docMerge has no active input");
      return Ok(());
    }
    let mut writer = ctx.create_doc_writer(0)?;
    let mut row = 0;
    for docs in &active {
      for doc in docs.documents() {
        ctx.check_cancelled_at(row)?;
        row += 1;
        writer.write(doc.clone())?;
      }
    }
    info!(
      active = active.len(),
      skipped = inputs.len() - active.len(),
      rows = writer.written(),
      "docMerge finished"
    );
    Ok(())
  }
}
