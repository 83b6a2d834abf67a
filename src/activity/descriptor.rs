//! Static activity metadata: ports, setting specs and categories, plus settings binding.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::instrument;

use super::DataStateMerger;
use crate::error::{ActivityError, ActivityResult};
use crate::types::{DataModel, SettingValue, Settings, SettingsPreview};

/// How many connections a port accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
  Single,
  /// Fan-in; only allowed on the last input port.
  OneOrMore,
}

/// One declared input or output port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortSpec {
  pub name: String,
  pub model: DataModel,
  pub multiplicity: Multiplicity,
}

impl PortSpec {
  pub fn single(name: impl Into<String>, model: DataModel) -> Self {
    Self {
      name: name.into(),
      model,
      multiplicity: Multiplicity::Single,
    }
  }

  pub fn one_or_more(name: impl Into<String>, model: DataModel) -> Self {
    Self {
      name: name.into(),
      model,
      multiplicity: Multiplicity::OneOrMore,
    }
  }
}

/// Kind and constraints of a setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettingKind {
  String {
    min_len: usize,
    max_len: Option<usize>,
  },
  Integer {
    min: Option<i64>,
    max: Option<i64>,
  },
  Boolean,
  List {
    item: Box<SettingKind>,
    min_items: usize,
  },
  /// Any JSON value, stored as is.
  Json,
}

impl SettingKind {
  /// Converts and checks one raw value.
  pub fn bind(&self, key: &str, raw: &serde_json::Value) -> ActivityResult<SettingValue> {
    match self {
      SettingKind::String { min_len, max_len } => {
        let s = raw
          .as_str()
          .ok_or_else(|| ActivityError::settings(key, "expected a string"))?;
        let len = s.chars().count();
        if len < *min_len {
          return Err(ActivityError::settings(
            key,
            format!("at least {} characters required", min_len),
          ));
        }
        if let Some(max) = max_len.filter(|m| len > *m) {
          return Err(ActivityError::settings(
            key,
            format!("at most {} characters allowed", max),
          ));
        }
        Ok(SettingValue::String(s.to_string()))
      }
      SettingKind::Integer { min, max } => {
        let i = raw
          .as_i64()
          .ok_or_else(|| ActivityError::settings(key, "expected an integer"))?;
        if let Some(m) = min.filter(|m| i < *m) {
          return Err(ActivityError::settings(key, format!("must be >= {}", m)));
        }
        if let Some(m) = max.filter(|m| i > *m) {
          return Err(ActivityError::settings(key, format!("must be <= {}", m)));
        }
        Ok(SettingValue::Integer(i))
      }
      SettingKind::Boolean => raw
        .as_bool()
        .map(SettingValue::Boolean)
        .ok_or_else(|| ActivityError::settings(key, "expected a boolean")),
      SettingKind::List { item, min_items } => {
        let items = raw
          .as_array()
          .ok_or_else(|| ActivityError::settings(key, "expected a list"))?;
        if items.len() < *min_items {
          return Err(ActivityError::settings(
            key,
            format!("at least {} items required", min_items),
          ));
        }
        items
          .iter()
          .map(|v| item.bind(key, v))
          .collect::<ActivityResult<Vec<_>>>()
          .map(SettingValue::List)
      }
      SettingKind::Json => Ok(SettingValue::Json(raw.clone())),
    }
  }
}

/// Declared setting of an activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingSpec {
  pub key: String,
  pub display_name: String,
  pub kind: SettingKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub default: Option<serde_json::Value>,
  pub required: bool,
}

impl SettingSpec {
  pub fn new(key: impl Into<String>, display_name: impl Into<String>, kind: SettingKind) -> Self {
    Self {
      key: key.into(),
      display_name: display_name.into(),
      kind,
      default: None,
      required: false,
    }
  }

  pub fn with_default(mut self, default: serde_json::Value) -> Self {
    self.default = Some(default);
    self
  }

  pub fn required(mut self) -> Self {
    self.required = true;
    self
  }
}

/// Grouping used by listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
  Source,
  Transform,
  Merge,
  Graph,
  Variables,
}

/// Everything known about an activity type without instantiating it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityDescriptor {
  pub activity_type: String,
  pub display_name: String,
  pub categories: Vec<ActivityCategory>,
  pub inputs: Vec<PortSpec>,
  pub outputs: Vec<PortSpec>,
  pub settings: Vec<SettingSpec>,
  pub merge_policy: DataStateMerger,
}

impl ActivityDescriptor {
  pub fn new(activity_type: impl Into<String>, display_name: impl Into<String>) -> Self {
    Self {
      activity_type: activity_type.into(),
      display_name: display_name.into(),
      categories: vec![],
      inputs: vec![],
      outputs: vec![],
      settings: vec![],
      merge_policy: DataStateMerger::default(),
    }
  }

  pub fn category(mut self, category: ActivityCategory) -> Self {
    self.categories.push(category);
    self
  }

  pub fn input(mut self, port: PortSpec) -> Self {
    self.inputs.push(port);
    self
  }

  pub fn output(mut self, port: PortSpec) -> Self {
    self.outputs.push(port);
    self
  }

  pub fn setting(mut self, spec: SettingSpec) -> Self {
    self.settings.push(spec);
    self
  }

  pub fn merge_policy(mut self, policy: DataStateMerger) -> Self {
    self.merge_policy = policy;
    self
  }

  pub fn setting_spec(&self, key: &str) -> Option<&SettingSpec> {
    self.settings.iter().find(|s| s.key == key)
  }

  /// Port list for `connections` incoming edges, expanding a trailing one-or-more
  /// port. Fails when the count does not fit the declaration.
  pub fn input_ports(&self, connections: usize) -> ActivityResult<Vec<PortSpec>> {
    let declared = self.inputs.len();
    match self.inputs.last() {
      Some(last) if last.multiplicity == Multiplicity::OneOrMore => {
        if connections < declared {
          return Err(ActivityError::execution(format!(
            "{} needs at least {} inputs, got {}",
            self.activity_type, declared, connections
          )));
        }
        let mut ports = self.inputs.clone();
        ports.extend(std::iter::repeat_n(last.clone(), connections - declared));
        Ok(ports)
      }
      _ if connections != declared => Err(ActivityError::execution(format!(
        "{} takes {} inputs, got {}",
        self.activity_type, declared, connections
      ))),
      _ => Ok(self.inputs.clone()),
    }
  }

  /// Binds raw settings: unknown keys are rejected, missing keys take their default,
  /// missing required keys fail.
  #[instrument(level = "trace", skip(self, raw), fields(activity = %self.activity_type))]
  pub fn bind(&self, raw: &BTreeMap<String, serde_json::Value>) -> ActivityResult<Settings> {
    if let Some(key) = raw.keys().find(|k| self.setting_spec(k).is_none()) {
      return Err(ActivityError::settings(key.clone(), "unknown setting"));
    }
    let mut values = BTreeMap::new();
    for spec in &self.settings {
      let value = match raw.get(&spec.key).or(spec.default.as_ref()) {
        Some(v) => spec.kind.bind(&spec.key, v)?,
        None if spec.required => {
          return Err(ActivityError::settings(spec.key.clone(), "required"));
        }
        None => continue,
      };
      values.insert(spec.key.clone(), value);
    }
    Ok(Settings::new(values))
  }

  /// Best-effort binding while the DAG is still edited: a value that is absent (with
  /// no default) or does not bind yet is reported as unknown instead of failing.
  pub fn preview_settings(&self, raw: &BTreeMap<String, serde_json::Value>) -> SettingsPreview {
    let values = self
      .settings
      .iter()
      .map(|spec| {
        let value = raw
          .get(&spec.key)
          .or(spec.default.as_ref())
          .and_then(|v| spec.kind.bind(&spec.key, v).ok());
        (spec.key.clone(), value)
      })
      .collect();
    SettingsPreview::new(values)
  }
}
