//! Tuple model: values, relational schemas, documents, graph elements, type previews
//! and settings.

mod graph_element;
#[cfg(test)]
mod graph_element_test;
mod schema;
mod settings;
mod type_preview;
mod value;
#[cfg(test)]
mod value_test;

pub use graph_element::{Edge, Node};
pub use schema::{Field, Schema, Tuple};
pub use settings::{SettingValue, Settings, SettingsPreview};
pub use type_preview::{DataModel, TypePreview, union_doc, union_lpg};
pub use value::{Document, Value, ValueType};
