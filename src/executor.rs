//! Runs bound activity instances against a checkpoint store.
//!
//! One call of [Executor::execute] is one activity run: inputs are resolved to
//! readers, the merge policy decides whether the activity runs, the activity is
//! dispatched in batch or pipe mode, and its staged outputs are committed
//! all-or-nothing once any export to the checkpoint directory has succeeded.
//! [Executor::run_pipe_chain] runs several pipeable activities
//! lock-step on one task, connected by bounded pipes; only the last stage's output is
//! committed.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::activity::{
  Activity, ActivityInstance, ExecutionContext, InputReaders, PendingCommit, PortSpec,
  VariableScope, VariableStore,
};
use crate::checkpoint::{CheckpointKey, CheckpointReader, CheckpointStore};
use crate::checkpoint_io;
use crate::config::EngineConfig;
use crate::error::{ActivityError, ActivityResult};
use crate::pipe::{self, CancellationToken};
use crate::types::{Settings, TypePreview};

/// Requested execution style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
  #[default]
  Batch,
  Pipe,
}

impl fmt::Display for ExecutionMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ExecutionMode::Batch => write!(f, "batch"),
      ExecutionMode::Pipe => write!(f, "pipe"),
    }
  }
}

impl FromStr for ExecutionMode {
  type Err = ActivityError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "batch" => Ok(ExecutionMode::Batch),
      "pipe" => Ok(ExecutionMode::Pipe),
      other => Err(ActivityError::settings(
        "mode",
        format!("'{}' is not batch or pipe", other),
      )),
    }
  }
}

/// Outcome of one activity run (or of one pipe chain, reported for its last stage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
  pub activity_id: Uuid,
  pub activity_type: String,
  pub mode: ExecutionMode,
  /// Merge-policy verdict; false when an OR activity had no active input.
  pub produced: bool,
  pub active_outputs: Vec<usize>,
  /// Records written per active output port.
  pub rows: BTreeMap<usize, usize>,
  /// Activity types of a pipe chain, first stage first.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub chain: Vec<String>,
  /// Variables published by this run.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub variables: BTreeMap<String, serde_json::Value>,
  /// Files written to the configured checkpoint directory.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub exported: Vec<PathBuf>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
  fn new(activity_id: Uuid, activity_type: &str, mode: ExecutionMode) -> Self {
    let now = Utc::now();
    Self {
      activity_id,
      activity_type: activity_type.to_string(),
      mode,
      produced: false,
      active_outputs: vec![],
      rows: BTreeMap::new(),
      chain: vec![],
      variables: BTreeMap::new(),
      exported: vec![],
      started_at: now,
      finished_at: now,
    }
  }

  /// Store key of one output port of the reported activity.
  pub fn output_key(&self, port: usize) -> CheckpointKey {
    CheckpointKey::new(self.activity_id, port)
  }

  pub fn total_rows(&self) -> usize {
    self.rows.values().sum()
  }
}

/// Validated preview of one instance: port counts and models are checked on both
/// sides of the activity's own `preview_out_types`.
#[instrument(level = "trace", skip(instance), fields(activity = %instance.activity_type()))]
pub fn preview(
  instance: &ActivityInstance,
  inputs: &[TypePreview],
) -> ActivityResult<Vec<TypePreview>> {
  let descriptor = instance.descriptor();
  let ports = descriptor.input_ports(inputs.len())?;
  for (port, (input, spec)) in inputs.iter().zip(&ports).enumerate() {
    input.expect_model(port, spec.model)?;
  }
  let outputs = instance.preview_out_types(inputs)?;
  if outputs.len() != descriptor.outputs.len() {
    return Err(ActivityError::execution(format!(
      "{} previewed {} outputs but declares {}",
      descriptor.activity_type,
      outputs.len(),
      descriptor.outputs.len()
    )));
  }
  for (port, (output, spec)) in outputs.iter().zip(&descriptor.outputs).enumerate() {
    output.expect_model(port, spec.model)?;
  }
  Ok(outputs)
}

/// One stage of a pipe chain.
struct Stage<'a> {
  activity: &'a mut dyn Activity,
  settings: &'a Settings,
}

type StageFuture<'a> = Pin<Box<dyn Future<Output = ActivityResult<usize>> + Send + 'a>>;

/// Runs activities of one workflow run. Cloning the store or variable handles shares
/// them with the caller.
pub struct Executor {
  config: EngineConfig,
  store: CheckpointStore,
  variables: VariableStore,
  cancel: CancellationToken,
}

impl Executor {
  pub fn new(config: EngineConfig) -> Self {
    Self::with_store(config, CheckpointStore::new(), VariableStore::new())
  }

  pub fn with_store(config: EngineConfig, store: CheckpointStore, variables: VariableStore) -> Self {
    Self {
      config,
      store,
      variables,
      cancel: CancellationToken::new(),
    }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn store(&self) -> &CheckpointStore {
    &self.store
  }

  pub fn variables(&self) -> &VariableStore {
    &self.variables
  }

  /// Token that aborts every running and future call of this executor.
  pub fn cancel_token(&self) -> &CancellationToken {
    &self.cancel
  }

  fn context(&self, activity_id: Uuid, outputs: Vec<PortSpec>) -> ExecutionContext {
    ExecutionContext::new(
      activity_id,
      outputs,
      self.store.clone(),
      self.variables.clone(),
      self.cancel.clone(),
    )
    .with_check_interval(self.config.cancel_check_interval)
  }

  /// Resolves input keys to readers. A missing key, or a key the store has no
  /// checkpoint for, is an inactive input.
  fn open_inputs(
    &self,
    ports: &[PortSpec],
    inputs: &[Option<CheckpointKey>],
  ) -> ActivityResult<InputReaders> {
    inputs
      .iter()
      .zip(ports)
      .enumerate()
      .map(|(port, (key, spec))| {
        let Some(key) = key else {
          return Ok(None);
        };
        match self.store.reader(key)? {
          Some(reader) if reader.data_model() != spec.model => Err(ActivityError::type_mismatch(
            port,
            spec.model.to_string(),
            reader.data_model().to_string(),
          )),
          reader => Ok(reader),
        }
      })
      .collect()
  }

  /// Runs one instance. Inputs are store keys, one per connection; `None` marks an
  /// inactive upstream branch.
  #[instrument(
    level = "trace",
    skip(self, instance, inputs),
    fields(activity = %instance.activity_type(), activity_id = %instance.id())
  )]
  pub async fn execute(
    &self,
    instance: &mut ActivityInstance,
    inputs: &[Option<CheckpointKey>],
    mode: ExecutionMode,
  ) -> ActivityResult<ExecutionReport> {
    if instance.executed {
      return Err(ActivityError::execution(format!(
        "{} already ran; reset it before running again",
        instance.activity_type()
      )));
    }
    let descriptor = instance.descriptor().clone();
    let mut report = ExecutionReport::new(instance.id, &descriptor.activity_type, mode);
    let ports = descriptor.input_ports(inputs.len())?;
    let readers = self.open_inputs(&ports, inputs)?;
    let active: Vec<bool> = readers.iter().map(Option::is_some).collect();
    descriptor.merge_policy.admit(&active)?;
    report.produced = descriptor.merge_policy.merge(&active);
    instance.executed = true;
    if !report.produced {
      info!(activity = %descriptor.activity_type, "no active input, nothing to produce");
      report.finished_at = Utc::now();
      return Ok(report);
    }
    self.cancel.check()?;

    info!(
      activity = %descriptor.activity_type,
      activity_id = %instance.id,
      %mode,
      inputs = active.len(),
      "activity starting"
    );
    let mut ctx = self.context(instance.id, descriptor.outputs.clone());
    let mut scope = VariableScope::new();
    if let Err(e) = self.dispatch(instance, readers, mode, &mut ctx, &mut scope).await {
      warn!(activity = %descriptor.activity_type, error = %e, "activity failed");
      ctx.discard();
      return Err(e);
    }
    report.active_outputs = ctx.active_ports();
    let pending = ctx.prepare()?;
    report.exported = self.export(&descriptor.activity_type, &pending)?;
    report.rows = pending.apply()?;
    report.variables = scope.entries().clone();
    self.variables.publish(scope)?;
    report.finished_at = Utc::now();
    info!(
      activity = %descriptor.activity_type,
      activity_id = %instance.id,
      %mode,
      rows = report.total_rows(),
      "activity finished"
    );
    Ok(report)
  }

  async fn dispatch(
    &self,
    instance: &mut ActivityInstance,
    readers: InputReaders,
    mode: ExecutionMode,
    ctx: &mut ExecutionContext,
    scope: &mut VariableScope,
  ) -> ActivityResult<()> {
    let settings = &instance.settings;
    let activity = instance.activity.as_mut();
    let caps = activity.capabilities();
    let activity_type = activity.activity_type().to_string();

    if let Some(writer) = activity.as_variable_writer() {
      return writer.execute(readers, settings, ctx, scope).await;
    }
    match mode {
      ExecutionMode::Batch if caps.batch => match activity.as_batch() {
        Some(batch) => batch.execute(readers, settings, ctx).await,
        None => Err(ActivityError::execution("batch capability disappeared")),
      },
      // pipe-only activity run as a one-stage chain over reader-fed pipes
      ExecutionMode::Batch | ExecutionMode::Pipe if caps.pipe => {
        let readers = require_all(readers)?;
        self
          .drive_chain(readers, vec![Stage { activity, settings }], ctx)
          .await
          .map(|_| ())
      }
      _ => Err(ActivityError::execution(format!(
        "{} cannot run in {} mode",
        activity_type, mode
      ))),
    }
  }

  /// Runs `chain` as one pipelined unit. `inputs` feed the first stage; every later
  /// stage takes the previous stage's output as its only input. Only the last stage's
  /// output is committed, under the last instance's id.
  #[instrument(level = "trace", skip_all, fields(stages = chain.len()))]
  pub async fn run_pipe_chain(
    &self,
    chain: &mut [ActivityInstance],
    inputs: &[Option<CheckpointKey>],
  ) -> ActivityResult<ExecutionReport> {
    let Some(last) = chain.last() else {
      return Err(ActivityError::execution("pipe chain is empty"));
    };
    let mut report = ExecutionReport::new(last.id, last.activity_type(), ExecutionMode::Pipe);
    let outputs = last.descriptor().outputs.clone();
    for (i, instance) in chain.iter_mut().enumerate() {
      let activity_type = instance.activity_type().to_string();
      if instance.executed {
        return Err(ActivityError::execution(format!(
          "{} already ran; reset it before running again",
          activity_type
        )));
      }
      if !instance.capabilities().pipe || instance.descriptor().merge_policy.tolerates_inactive_inputs() {
        return Err(ActivityError::execution(format!(
          "{} cannot be a pipe stage",
          activity_type
        )));
      }
      if i > 0 {
        instance.descriptor().input_ports(1)?;
      }
      report.chain.push(activity_type);
    }

    let first = &chain[0];
    let ports = first.descriptor().input_ports(inputs.len())?;
    let readers = self.open_inputs(&ports, inputs)?;
    let active: Vec<bool> = readers.iter().map(Option::is_some).collect();
    first.descriptor().merge_policy.admit(&active)?;
    let readers = require_all(readers)?;
    self.cancel.check()?;

    info!(chain = ?report.chain, "pipe chain starting");
    let mut ctx = self.context(report.activity_id, outputs);
    let stages: Vec<Stage<'_>> = chain
      .iter_mut()
      .map(|instance| {
        instance.executed = true;
        Stage {
          activity: instance.activity.as_mut(),
          settings: &instance.settings,
        }
      })
      .collect();
    if let Err(e) = self.drive_chain(readers, stages, &mut ctx).await {
      warn!(chain = ?report.chain, error = %e, "pipe chain failed");
      ctx.discard();
      return Err(e);
    }
    report.produced = true;
    report.active_outputs = ctx.active_ports();
    let pending = ctx.prepare()?;
    report.exported = self.export(&report.activity_type, &pending)?;
    report.rows = pending.apply()?;
    report.finished_at = Utc::now();
    info!(chain = ?report.chain, rows = report.total_rows(), "pipe chain finished");
    Ok(report)
  }

  /// Locks every stage's output type in order, wires the stages with bounded pipes and
  /// drives feeders, stages and the final drain together. The first failure cancels
  /// the chain and is returned. Returns the number of rows drained.
  async fn drive_chain(
    &self,
    readers: Vec<Box<dyn CheckpointReader>>,
    mut stages: Vec<Stage<'_>>,
    ctx: &mut ExecutionContext,
  ) -> ActivityResult<usize> {
    let mut input_types: Vec<TypePreview> = readers.iter().map(|r| r.tuple_type()).collect();
    let mut locked = Vec::with_capacity(stages.len());
    for stage in stages.iter_mut() {
      let out_model = stage
        .activity
        .descriptor()
        .outputs
        .first()
        .map(|p| p.model)
        .ok_or_else(|| ActivityError::execution("pipe stage declares no output"))?;
      let previewed = stage
        .activity
        .preview_out_types(&input_types, &stage.settings.preview())?;
      let pipeable = stage
        .activity
        .as_pipeable()
        .ok_or_else(|| ActivityError::execution("stage is not pipeable"))?;
      let out = pipeable.lock_output_type(&input_types, stage.settings)?;
      out.require_model(0, out_model)?;
      if let Some(preview) = previewed.first() {
        if !out.refines(preview) {
          return Err(ActivityError::type_mismatch(0, preview.to_string(), out.to_string()));
        }
      }
      input_types = vec![out.clone()];
      locked.push(out);
    }
    let Some(final_type) = locked.last().cloned() else {
      return Err(ActivityError::execution("pipe chain is empty"));
    };

    let cancel = CancellationToken::new();
    let capacity = self.config.pipe_capacity;
    let mut tasks: Vec<StageFuture<'_>> = vec![];
    let mut next_inputs = vec![];
    for reader in &readers {
      let (tx, rx) = pipe::channel(capacity, reader.tuple_type(), &cancel);
      next_inputs.push(rx);
      tasks.push(Box::pin(pipe::feed_from_reader(reader.as_ref(), tx)));
    }
    for (stage, out_type) in stages.iter_mut().zip(locked) {
      let (tx, rx) = pipe::channel(capacity, out_type, &cancel);
      let inputs = std::mem::replace(&mut next_inputs, vec![rx]);
      let settings = stage.settings;
      let pipeable = stage
        .activity
        .as_pipeable()
        .ok_or_else(|| ActivityError::execution("stage is not pipeable"))?;
      let cancel = &cancel;
      tasks.push(Box::pin(async move {
        pipeable.pipe(inputs, tx, settings, cancel).await.map(|()| 0)
      }));
    }
    let Some(sink) = next_inputs.pop() else {
      return Err(ActivityError::execution("pipe chain has no output"));
    };
    let mut writer = ctx.create_writer_for(0, &final_type)?;
    tasks.push(Box::pin(async move {
      let drained = pipe::drain_into(sink, writer.as_mut()).await?;
      writer.close()?;
      Ok(drained)
    }));

    let result = tokio::select! {
      r = futures::future::try_join_all(tasks) => r,
      _ = self.cancel.cancelled() => Err(ActivityError::Cancelled),
    };
    match result {
      Ok(counts) => Ok(counts.last().copied().unwrap_or(0)),
      Err(e) => {
        cancel.cancel();
        Err(e)
      }
    }
  }

  /// Writes the staged outputs to the checkpoint directory, if one is configured.
  /// Runs before the outputs become visible, so a failed export commits nothing.
  fn export(&self, activity_type: &str, pending: &PendingCommit) -> ActivityResult<Vec<PathBuf>> {
    match &self.config.checkpoint_dir {
      Some(dir) => checkpoint_io::export_outputs(dir, activity_type, pending.checkpoints()),
      None => Ok(vec![]),
    }
  }
}

/// Pipe stages cannot skip an input: every reader must be present.
fn require_all(readers: InputReaders) -> ActivityResult<Vec<Box<dyn CheckpointReader>>> {
  readers
    .into_iter()
    .enumerate()
    .map(|(port, r)| r.ok_or_else(|| ActivityError::input_failure(port, "pipe input is not active")))
    .collect()
}
