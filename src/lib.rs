//! # polyweave
//!
//! Execution core of a multi-model dataflow engine. Activities are transform units in
//! a DAG that read and write three data models: relational tuples, document
//! collections and labeled-property graphs.
//!
//! ## Architecture
//!
//! - `types`: values, schemas, documents, graph elements, type previews and settings
//! - `checkpoint`: materialized per-port data with restartable readers and staged
//!   writers
//! - `pipe`: bounded, back-pressured streaming between pipelined activities
//! - `activity`: the activity contract (type preview, batch execution, piping,
//!   variable writing), merge policies, execution context and registry
//! - `activities`: built-in activities
//! - `executor`: dispatch, merge-policy gating, pipe chains and commit
//!
//! Set RUST_LOG=polyweave=trace for per-row pipe events.

pub mod activities;
pub mod activity;
pub mod checkpoint;
pub mod checkpoint_io;
pub mod config;
pub mod error;
pub mod executor;
pub mod pipe;
pub mod types;

pub use activity::{
  Activity, ActivityDescriptor, ActivityInstance, ActivityRegistry, BatchActivity,
  DataStateMerger, ExecutionContext, Pipeable, VariableScope, VariableStore, VariableWriter,
  default_registry,
};
pub use checkpoint::{Checkpoint, CheckpointKey, CheckpointReader, CheckpointStore, CheckpointWriter};
pub use config::EngineConfig;
pub use error::{ActivityError, ActivityResult, ErrorKind};
pub use executor::{ExecutionMode, ExecutionReport, Executor};
pub use pipe::{CancellationToken, InputPipe, OutputPipe};
pub use types::{DataModel, Document, Edge, Node, Schema, Tuple, TypePreview, Value};
