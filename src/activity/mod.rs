//! Activity contract and the machinery around it.
//!
//! - [ActivityDescriptor]: static ports, settings specs and merge policy
//! - [Activity] with optional [BatchActivity], [Pipeable] and [VariableWriter]
//! - [DataStateMerger]: AND/OR partial activation
//! - [ExecutionContext]: lazily created writers, staged until commit
//! - [ActivityRegistry]: type string to factory lookup

mod context;
#[cfg(test)]
mod context_test;
mod contract;
mod descriptor;
mod merge_policy;
mod registry;
mod variables;

pub use context::ExecutionContext;
pub(crate) use context::PendingCommit;
pub use contract::{Activity, BatchActivity, Capabilities, InputReaders, Pipeable, VariableWriter};
pub use descriptor::{
  ActivityCategory, ActivityDescriptor, Multiplicity, PortSpec, SettingKind, SettingSpec,
};
pub use merge_policy::DataStateMerger;
pub use registry::{ActivityFactory, ActivityInstance, ActivityRegistry, default_registry};
pub use variables::{VariableScope, VariableStore};
