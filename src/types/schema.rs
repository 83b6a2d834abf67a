//! Relational schema and tuples.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Value, ValueType};
use crate::error::{ActivityError, ActivityResult};

/// A relational row: one value per schema field, in field order.
pub type Tuple = Vec<Value>;

/// One named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
  pub name: String,
  pub value_type: ValueType,
  #[serde(default = "default_nullable")]
  pub nullable: bool,
}

fn default_nullable() -> bool {
  true
}

impl Field {
  pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
    Self {
      name: name.into(),
      value_type,
      nullable: true,
    }
  }

  pub fn not_null(mut self) -> Self {
    self.nullable = false;
    self
  }

  fn accepts(&self, value: &Value) -> bool {
    match value {
      Value::Null => self.nullable,
      v => v.value_type() == self.value_type,
    }
  }
}

/// Ordered list of uniquely named fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
  fields: Vec<Field>,
}

impl Schema {
  /// Builds a schema; fails when two fields share a name.
  pub fn new(fields: Vec<Field>) -> ActivityResult<Self> {
    let mut seen = HashSet::new();
    for f in &fields {
      if !seen.insert(f.name.as_str()) {
        return Err(ActivityError::execution(format!(
          "duplicate field name '{}' in schema",
          f.name
        )));
      }
    }
    Ok(Self { fields })
  }

  pub fn empty() -> Self {
    Self { fields: Vec::new() }
  }

  pub fn fields(&self) -> &[Field] {
    &self.fields
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.fields.iter().position(|f| f.name == name)
  }

  pub fn field_names(&self) -> impl Iterator<Item = &str> {
    self.fields.iter().map(|f| f.name.as_str())
  }

  /// Checks arity and per-column type of `tuple`.
  pub fn validate(&self, tuple: &[Value]) -> ActivityResult<()> {
    if tuple.len() != self.fields.len() {
      return Err(ActivityError::execution(format!(
        "tuple has {} values, schema has {} fields",
        tuple.len(),
        self.fields.len()
      )));
    }
    for (field, value) in self.fields.iter().zip(tuple) {
      if !field.accepts(value) {
        return Err(ActivityError::execution(format!(
          "field '{}' expects {}, got {}",
          field.name,
          field.value_type,
          value.value_type()
        )));
      }
    }
    Ok(())
  }
}

impl fmt::Display for Schema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    for (i, field) in self.fields.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      write!(f, "{} {}", field.name, field.value_type)?;
    }
    write!(f, ")")
  }
}

#[derive(Deserialize)]
struct RawSchema {
  fields: Vec<Field>,
}

impl<'de> Deserialize<'de> for Schema {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = RawSchema::deserialize(deserializer)?;
    Schema::new(raw.fields).map_err(serde::de::Error::custom)
  }
}
