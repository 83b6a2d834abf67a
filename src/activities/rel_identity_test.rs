//! Tests for the relational identity.

use super::rel_identity::RelIdentity;
use crate::activity::{Activity, Pipeable};
use crate::error::{ActivityError, ActivityResult};
use crate::pipe::{CancellationToken, channel};
use crate::types::{Field, Schema, Settings, SettingsPreview, TypePreview, Value, ValueType};

fn rel() -> TypePreview {
  TypePreview::rel(Schema::new(vec![Field::new("id", ValueType::Integer)]).unwrap())
}

#[test]
fn preview_passes_input_through() {
  let a = RelIdentity;
  let s = SettingsPreview::default();
  assert_eq!(a.preview_out_types(&[rel()], &s).unwrap(), vec![rel()]);
  assert_eq!(
    a.preview_out_types(&[TypePreview::Unknown], &s).unwrap(),
    vec![TypePreview::Unknown]
  );
  assert!(matches!(
    a.preview_out_types(&[TypePreview::doc(["a"])], &s),
    Err(ActivityError::TypeMismatch { port: 0, .. })
  ));
}

#[test]
fn lock_needs_a_concrete_relational_input() {
  let a = RelIdentity;
  let s = Settings::default();
  assert_eq!(a.lock_output_type(&[rel()], &s).unwrap(), rel());
  assert!(a.lock_output_type(&[TypePreview::Unknown], &s).is_err());
  assert!(a.lock_output_type(&[], &s).is_err());
}

#[tokio::test]
async fn forwards_every_tuple_in_order() {
  let cancel = CancellationToken::new();
  let (mut src, stage_in) = channel(1, rel(), &cancel);
  let (stage_out, mut sink) = channel(1, rel(), &cancel);
  let mut a = RelIdentity;
  let settings = Settings::default();
  let feed = async move {
    for i in 0..20_i64 {
      src.put(vec![Value::from(i)]).await?;
    }
    ActivityResult::Ok(())
  };
  let stage = a.pipe(vec![stage_in], stage_out, &settings, &cancel);
  let drain = async {
    let mut got = vec![];
    while let Some(t) = sink.next().await? {
      got.push(t[0].as_integer().unwrap());
    }
    ActivityResult::Ok(got)
  };
  let (_, _, got) = futures::future::try_join3(feed, stage, drain).await.unwrap();
  assert_eq!(got, (0..20).collect::<Vec<_>>());
}
