//! CLI: run one built-in activity over checkpoint files.
//!
//! Usage: `run_activity <COMMAND>`
//! Example: run_activity run docMerge left.json right.json - --out-dir out
//!
//! Inputs are checkpoint JSON files, one per input connection; `-` marks an inactive
//! branch. Outputs, published variables and the run report are written to --out-dir.
//!
//! Set RUST_LOG=polyweave=trace for TRACE-level span enter/exit and events.

use clap::{Args, Parser, Subcommand};
use polyweave::activity::ActivityInstance;
use polyweave::checkpoint_io::{self, REPORT_FILENAME, VARIABLES_FILENAME};
use polyweave::executor::preview;
use polyweave::{
  ActivityError, ActivityResult, CheckpointKey, EngineConfig, ExecutionMode, Executor,
  TypePreview, default_registry,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};
use uuid::Uuid;

/// Run one polyweave activity over checkpoint files.
#[derive(Parser, Debug)]
#[command(name = "run_activity")]
#[command(
  after_help = r#"Environment variables (override --config and flags when set):
  POLYWEAVE_PIPE_CAPACITY   Slots per pipe between pipelined activities (default: 1).
  POLYWEAVE_CHECKPOINT_DIR  Directory committed outputs are exported to.

Examples:
  run_activity list
  run_activity describe relLimit
  run_activity preview docMerge a.json b.json -
  run_activity run relLimit --set limit=2 --mode pipe rows.json --out-dir out"#
)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List registered activity types
  List,
  /// Print the descriptor of one activity type as JSON
  Describe {
    #[arg(value_name = "TYPE")]
    activity_type: String,
  },
  /// Print the output types an activity would produce for the given inputs
  Preview(ActivityArgs),
  /// Run an activity and commit its outputs
  Run {
    #[command(flatten)]
    activity: ActivityArgs,

    /// Execution mode: batch or pipe
    #[arg(long, default_value = "batch")]
    mode: ExecutionMode,

    /// Engine config JSON file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Slots per pipe. Overridden by POLYWEAVE_PIPE_CAPACITY if set.
    #[arg(long, value_name = "N")]
    pipe_capacity: Option<usize>,

    /// Directory for outputs, variables.json and report.json. Overridden by
    /// POLYWEAVE_CHECKPOINT_DIR if set.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
  },
}

#[derive(Args, Debug)]
struct ActivityArgs {
  /// Activity type, e.g. docMerge
  #[arg(value_name = "TYPE")]
  activity_type: String,

  /// Setting as key=value; value is parsed as JSON, falling back to a plain string
  #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_setting)]
  settings: Vec<(String, serde_json::Value)>,

  /// Checkpoint JSON files, one per input connection; `-` for an inactive input
  #[arg(value_name = "INPUT")]
  inputs: Vec<String>,
}

fn parse_setting(s: &str) -> Result<(String, serde_json::Value), String> {
  let (key, raw) = s
    .split_once('=')
    .ok_or_else(|| format!("'{}' is not KEY=VALUE", s))?;
  let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
  Ok((key.to_string(), value))
}

impl ActivityArgs {
  fn raw_settings(&self) -> BTreeMap<String, serde_json::Value> {
    self.settings.iter().cloned().collect()
  }

  fn instantiate(&self) -> ActivityResult<ActivityInstance> {
    default_registry().instantiate(&self.activity_type, &self.raw_settings())
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  info!(command = ?cli.command, "run_activity starting");

  let result = match cli.command {
    Command::List => list(),
    Command::Describe { activity_type } => describe(&activity_type),
    Command::Preview(args) => preview_cmd(&args),
    Command::Run {
      activity,
      mode,
      config,
      pipe_capacity,
      out_dir,
    } => run(&activity, mode, config, pipe_capacity, out_dir).await,
  };
  if let Err(e) = result {
    eprintln!("Error: {}", e);
    process::exit(1);
  }
}

fn list() -> ActivityResult<()> {
  let registry = default_registry();
  for activity_type in registry.activity_types() {
    let caps = registry.capabilities(activity_type).unwrap_or_default();
    println!(
      "{}\tbatch={} pipe={} variables={}",
      activity_type, caps.batch, caps.pipe, caps.variables
    );
  }
  Ok(())
}

fn describe(activity_type: &str) -> ActivityResult<()> {
  let descriptor = default_registry()
    .descriptor(activity_type)
    .ok_or_else(|| ActivityError::UnknownActivity(activity_type.to_string()))?;
  println!("{}", serde_json::to_string_pretty(descriptor)?);
  Ok(())
}

fn preview_cmd(args: &ActivityArgs) -> ActivityResult<()> {
  let instance = args.instantiate()?;
  let inputs = args
    .inputs
    .iter()
    .map(|arg| match arg.as_str() {
      "-" => Ok(TypePreview::Unknown),
      path => Ok(checkpoint_io::load_checkpoint(path.as_ref())?.type_preview()),
    })
    .collect::<ActivityResult<Vec<_>>>()?;
  let outputs = preview(&instance, &inputs)?;
  println!("{}", serde_json::to_string_pretty(&outputs)?);
  Ok(())
}

async fn run(
  args: &ActivityArgs,
  mode: ExecutionMode,
  config_path: Option<PathBuf>,
  pipe_capacity: Option<usize>,
  out_dir: Option<PathBuf>,
) -> ActivityResult<()> {
  // Env vars override flags, flags override the config file.
  let mut config = match &config_path {
    Some(path) => EngineConfig::from_json_file(path)?,
    None => EngineConfig::default(),
  };
  if let Some(capacity) = pipe_capacity {
    config.pipe_capacity = capacity;
  }
  if out_dir.is_some() {
    config.checkpoint_dir = out_dir;
  }
  let config = config.apply_env()?;
  info!(
    pipe_capacity = config.pipe_capacity,
    checkpoint_dir = ?config.checkpoint_dir,
    "options (env, flags or config)"
  );

  let mut instance = args.instantiate()?;
  let executor = Executor::new(config);
  let mut keys = Vec::with_capacity(args.inputs.len());
  for arg in &args.inputs {
    if arg == "-" {
      keys.push(None);
      continue;
    }
    let cp = checkpoint_io::load_checkpoint(arg.as_ref())?;
    let key = CheckpointKey::new(Uuid::new_v4(), 0);
    info!(path = %arg, %key, records = cp.len(), "loaded input");
    executor.store().put(key, cp)?;
    keys.push(Some(key));
  }

  let report = executor.execute(&mut instance, &keys, mode).await?;
  if let Some(dir) = &executor.config().checkpoint_dir {
    checkpoint_io::save_variables(&dir.join(VARIABLES_FILENAME), &executor.variables().snapshot())?;
    checkpoint_io::save_report(&dir.join(REPORT_FILENAME), &report)?;
  }
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}
