//! Tests for `setVariable`.

use std::collections::BTreeMap;

use serde_json::json;
use uuid::Uuid;

use super::set_variable::create;
use crate::activity::{ExecutionContext, VariableScope, VariableStore};
use crate::checkpoint::CheckpointStore;
use crate::pipe::CancellationToken;

fn bind(pairs: &[(&str, serde_json::Value)]) -> crate::error::ActivityResult<crate::types::Settings> {
  let raw: BTreeMap<String, serde_json::Value> = pairs
    .iter()
    .map(|(k, v)| (k.to_string(), v.clone()))
    .collect();
  create().descriptor().bind(&raw)
}

#[tokio::test]
async fn writes_value_under_name() {
  let settings = bind(&[("name", json!("threshold")), ("value", json!({"max": 3}))]).unwrap();
  let mut a = create();
  let mut ctx = ExecutionContext::new(
    Uuid::new_v4(),
    vec![],
    CheckpointStore::new(),
    VariableStore::new(),
    CancellationToken::new(),
  );
  let mut scope = VariableScope::new();
  a.as_variable_writer()
    .unwrap()
    .execute(vec![], &settings, &mut ctx, &mut scope)
    .await
    .unwrap();
  assert_eq!(scope.get("threshold"), Some(&json!({"max": 3})));
  assert!(a.preview_out_types(&[], &settings.preview()).unwrap().is_empty());
}

#[test]
fn value_defaults_to_null_and_name_is_required() {
  let s = bind(&[("name", json!("x"))]).unwrap();
  assert_eq!(s.get_json("value").unwrap(), serde_json::Value::Null);
  assert!(bind(&[]).is_err());
  assert!(bind(&[("name", json!("n".repeat(65)))]).is_err());
}

#[test]
fn last_write_wins_in_scope() {
  let mut scope = VariableScope::new();
  scope.set("k", json!(1));
  scope.set("k", json!(2));
  assert_eq!(scope.entries().len(), 1);
  assert_eq!(scope.get("k"), Some(&json!(2)));
}
