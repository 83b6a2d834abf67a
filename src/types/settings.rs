//! Bound setting values and their partially-known preview form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ActivityError, ActivityResult};

/// One bound setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
  Boolean(bool),
  Integer(i64),
  String(String),
  List(Vec<SettingValue>),
  /// Free-form JSON (objects, floats, null).
  Json(serde_json::Value),
}

impl SettingValue {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      SettingValue::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_integer(&self) -> Option<i64> {
    match self {
      SettingValue::Integer(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      SettingValue::Boolean(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[SettingValue]> {
    match self {
      SettingValue::List(l) => Some(l),
      _ => None,
    }
  }

  pub fn to_json(&self) -> serde_json::Value {
    match self {
      SettingValue::Boolean(b) => serde_json::Value::Bool(*b),
      SettingValue::Integer(i) => serde_json::Value::from(*i),
      SettingValue::String(s) => serde_json::Value::String(s.clone()),
      SettingValue::List(l) => serde_json::Value::Array(l.iter().map(Self::to_json).collect()),
      SettingValue::Json(v) => v.clone(),
    }
  }
}

/// Fully bound settings of one activity instance. Immutable once bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
  values: BTreeMap<String, SettingValue>,
}

impl Settings {
  pub fn new(values: BTreeMap<String, SettingValue>) -> Self {
    Self { values }
  }

  pub fn get(&self, key: &str) -> Option<&SettingValue> {
    self.values.get(key)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v))
  }

  fn require(&self, key: &str) -> ActivityResult<&SettingValue> {
    self
      .values
      .get(key)
      .ok_or_else(|| ActivityError::settings(key, "not bound"))
  }

  pub fn get_string(&self, key: &str) -> ActivityResult<&str> {
    self
      .require(key)?
      .as_str()
      .ok_or_else(|| ActivityError::settings(key, "expected a string"))
  }

  pub fn get_integer(&self, key: &str) -> ActivityResult<i64> {
    self
      .require(key)?
      .as_integer()
      .ok_or_else(|| ActivityError::settings(key, "expected an integer"))
  }

  pub fn get_bool(&self, key: &str) -> ActivityResult<bool> {
    self
      .require(key)?
      .as_bool()
      .ok_or_else(|| ActivityError::settings(key, "expected a boolean"))
  }

  pub fn get_json(&self, key: &str) -> ActivityResult<serde_json::Value> {
    Ok(self.require(key)?.to_json())
  }

  /// All values known.
  pub fn preview(&self) -> SettingsPreview {
    SettingsPreview {
      values: self
        .values
        .iter()
        .map(|(k, v)| (k.clone(), Some(v.clone())))
        .collect(),
    }
  }
}

/// Settings as seen while the DAG is still being edited: any value may be unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPreview {
  values: BTreeMap<String, Option<SettingValue>>,
}

impl SettingsPreview {
  pub fn new(values: BTreeMap<String, Option<SettingValue>>) -> Self {
    Self { values }
  }

  pub fn with(mut self, key: impl Into<String>, value: Option<SettingValue>) -> Self {
    self.values.insert(key.into(), value);
    self
  }

  /// The value if it is known.
  pub fn get(&self, key: &str) -> Option<&SettingValue> {
    self.values.get(key).and_then(Option::as_ref)
  }

  pub fn is_known(&self, key: &str) -> bool {
    self.get(key).is_some()
  }
}
