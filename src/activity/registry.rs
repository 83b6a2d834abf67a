//! Lookup table from activity type string to a factory, and bound activity instances.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Activity, ActivityDescriptor, Capabilities, DataStateMerger};
use crate::error::{ActivityError, ActivityResult};
use crate::types::{Settings, SettingsPreview, TypePreview};

/// Builds a fresh, unbound activity.
pub type ActivityFactory = fn() -> Box<dyn Activity>;

struct Entry {
  descriptor: ActivityDescriptor,
  capabilities: Capabilities,
  factory: ActivityFactory,
}

#[derive(Default)]
pub struct ActivityRegistry {
  entries: BTreeMap<String, Entry>,
}

static DEFAULT_REGISTRY: Lazy<ActivityRegistry> = Lazy::new(|| {
  let mut registry = ActivityRegistry::new();
  for factory in crate::activities::builtin_factories() {
    if let Err(e) = registry.register(factory) {
      tracing::error!(error = %e, "skipping built-in activity");
    }
  }
  registry
});

/// Registry holding every built-in activity.
pub fn default_registry() -> &'static ActivityRegistry {
  &DEFAULT_REGISTRY
}

impl ActivityRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds an activity type. Fails on a duplicate type string and on an OR-policy
  /// activity that claims to be pipeable.
  #[instrument(level = "trace", skip(self, factory))]
  pub fn register(&mut self, factory: ActivityFactory) -> ActivityResult<()> {
    let mut probe = factory();
    let descriptor = probe.descriptor().clone();
    let capabilities = probe.capabilities();
    if self.entries.contains_key(&descriptor.activity_type) {
      return Err(ActivityError::execution(format!(
        "activity type '{}' is already registered",
        descriptor.activity_type
      )));
    }
    if descriptor.merge_policy == DataStateMerger::Or && capabilities.pipe {
      return Err(ActivityError::execution(format!(
        "'{}' merges with OR and cannot be pipeable",
        descriptor.activity_type
      )));
    }
    self.entries.insert(
      descriptor.activity_type.clone(),
      Entry {
        descriptor,
        capabilities,
        factory,
      },
    );
    Ok(())
  }

  pub fn contains(&self, activity_type: &str) -> bool {
    self.entries.contains_key(activity_type)
  }

  pub fn descriptor(&self, activity_type: &str) -> Option<&ActivityDescriptor> {
    self.entries.get(activity_type).map(|e| &e.descriptor)
  }

  pub fn capabilities(&self, activity_type: &str) -> Option<Capabilities> {
    self.entries.get(activity_type).map(|e| e.capabilities)
  }

  /// Registered type strings in sorted order.
  pub fn activity_types(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn entry(&self, activity_type: &str) -> ActivityResult<&Entry> {
    self
      .entries
      .get(activity_type)
      .ok_or_else(|| ActivityError::UnknownActivity(activity_type.to_string()))
  }

  /// Preview-time settings for a type from partially filled raw settings.
  pub fn preview_settings(
    &self,
    activity_type: &str,
    raw: &BTreeMap<String, serde_json::Value>,
  ) -> ActivityResult<SettingsPreview> {
    Ok(self.entry(activity_type)?.descriptor.preview_settings(raw))
  }

  /// Creates an activity and binds its settings.
  pub fn instantiate(
    &self,
    activity_type: &str,
    raw: &BTreeMap<String, serde_json::Value>,
  ) -> ActivityResult<ActivityInstance> {
    let entry = self.entry(activity_type)?;
    let settings = entry.descriptor.bind(raw)?;
    let instance = ActivityInstance::new((entry.factory)(), settings);
    info!(activity = activity_type, activity_id = %instance.id(), "activity instantiated");
    Ok(instance)
  }
}

/// An activity with its settings bound. Settings never change after binding.
pub struct ActivityInstance {
  pub(crate) id: Uuid,
  pub(crate) activity: Box<dyn Activity>,
  pub(crate) settings: Settings,
  pub(crate) executed: bool,
}

impl ActivityInstance {
  pub fn new(activity: Box<dyn Activity>, settings: Settings) -> Self {
    Self {
      id: Uuid::new_v4(),
      activity,
      settings,
      executed: false,
    }
  }

  /// Same as [ActivityInstance::new] with a caller-chosen id.
  pub fn with_id(id: Uuid, activity: Box<dyn Activity>, settings: Settings) -> Self {
    Self {
      id,
      ..Self::new(activity, settings)
    }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn descriptor(&self) -> &ActivityDescriptor {
    self.activity.descriptor()
  }

  pub fn activity_type(&self) -> &str {
    self.activity.activity_type()
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn capabilities(&mut self) -> Capabilities {
    self.activity.capabilities()
  }

  /// Output previews with every bound setting known.
  pub fn preview_out_types(&self, inputs: &[TypePreview]) -> ActivityResult<Vec<TypePreview>> {
    self
      .activity
      .preview_out_types(inputs, &self.settings.preview())
  }

  /// Whether the instance ran since it was created or last reset.
  pub fn has_executed(&self) -> bool {
    self.executed
  }

  /// Makes the instance runnable again.
  pub fn reset(&mut self) {
    self.activity.reset();
    self.executed = false;
  }
}
