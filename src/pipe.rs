//! Streaming pipes between pipelined activities.
//!
//! A pipe is a bounded channel (capacity 1 unless configured otherwise). `next` on
//! the [InputPipe] suspends until the producer has a tuple or has finished; `put` on
//! the [OutputPipe] suspends while the consumer is behind. Dropping the output end
//! is the end-of-stream signal. Cancelling the shared [CancellationToken] makes every
//! pending and future `next`/`put` in the chain fail with `Cancelled`.

use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use tokio::sync::{mpsc, watch};
use tracing::{instrument, trace};

use crate::checkpoint::{CheckpointReader, CheckpointWriter};
use crate::error::{ActivityError, ActivityResult};
use crate::types::{Tuple, TypePreview, Value};

/// Cooperative cancellation shared by every stage of a run. Cloning shares the signal.
#[derive(Debug, Clone)]
pub struct CancellationToken {
  tx: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
  fn default() -> Self {
    Self::new()
  }
}

impl CancellationToken {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(false);
    Self { tx: Arc::new(tx) }
  }

  pub fn cancel(&self) {
    self.tx.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    *self.tx.borrow()
  }

  /// `Err(Cancelled)` once the token has been cancelled.
  pub fn check(&self) -> ActivityResult<()> {
    if self.is_cancelled() {
      Err(ActivityError::Cancelled)
    } else {
      Ok(())
    }
  }

  /// Completes when the token is cancelled.
  pub async fn cancelled(&self) {
    let mut rx = self.tx.subscribe();
    // The sender lives as long as `self`, so this only returns once cancelled.
    let _ = rx.wait_for(|c| *c).await;
  }
}

/// Creates a connected pipe carrying tuples of `pipe_type`.
pub fn channel(
  capacity: usize,
  pipe_type: TypePreview,
  cancel: &CancellationToken,
) -> (OutputPipe, InputPipe) {
  let (tx, rx) = mpsc::channel(capacity.max(1));
  (
    OutputPipe {
      tx,
      cancel: cancel.clone(),
      output_type: pipe_type.clone(),
      sent: 0,
    },
    InputPipe {
      rx,
      cancel: cancel.clone(),
      input_type: pipe_type,
      received: 0,
    },
  )
}

/// Consuming end of a pipe. Single pass; cannot be restarted.
pub struct InputPipe {
  rx: mpsc::Receiver<Tuple>,
  cancel: CancellationToken,
  input_type: TypePreview,
  received: usize,
}

impl InputPipe {
  /// Locked type of the tuples arriving on this pipe.
  pub fn input_type(&self) -> &TypePreview {
    &self.input_type
  }

  /// Next tuple, or `None` once the producer has finished.
  pub async fn next(&mut self) -> ActivityResult<Option<Tuple>> {
    let item = tokio::select! {
      biased;
      _ = self.cancel.cancelled() => return Err(ActivityError::Cancelled),
      item = self.rx.recv() => item,
    };
    if item.is_some() {
      self.received += 1;
    }
    Ok(item)
  }

  pub fn received(&self) -> usize {
    self.received
  }

  /// Stream view of the pipe; ends after end-of-stream or the first error.
  pub fn into_stream(mut self) -> impl Stream<Item = ActivityResult<Tuple>> + Send {
    stream! {
      loop {
        match self.next().await {
          Ok(Some(t)) => yield Ok(t),
          Ok(None) => break,
          Err(e) => {
            yield Err(e);
            break;
          }
        }
      }
    }
  }
}

/// Producing end of a pipe.
pub struct OutputPipe {
  tx: mpsc::Sender<Tuple>,
  cancel: CancellationToken,
  output_type: TypePreview,
  sent: usize,
}

impl OutputPipe {
  /// Locked type every tuple put on this pipe must satisfy.
  pub fn output_type(&self) -> &TypePreview {
    &self.output_type
  }

  /// Sends one tuple downstream, waiting while the consumer is behind.
  pub async fn put(&mut self, tuple: Tuple) -> ActivityResult<()> {
    check_tuple(&self.output_type, &tuple)?;
    tokio::select! {
      biased;
      _ = self.cancel.cancelled() => return Err(ActivityError::Cancelled),
      r = self.tx.send(tuple) => r.map_err(|_| ActivityError::PipeClosed)?,
    }
    self.sent += 1;
    Ok(())
  }

  pub fn sent(&self) -> usize {
    self.sent
  }
}

fn check_tuple(pipe_type: &TypePreview, tuple: &[Value]) -> ActivityResult<()> {
  match pipe_type {
    TypePreview::Rel {
      schema,
      exact: true,
    } => schema.validate(tuple),
    TypePreview::Rel { schema, .. } if tuple.len() < schema.len() => Err(ActivityError::execution(
      format!("tuple has {} values, schema needs at least {}", tuple.len(), schema.len()),
    )),
    TypePreview::Doc { .. } => match tuple {
      [Value::Document(_)] => Ok(()),
      _ => Err(ActivityError::execution("document pipe expects one document per tuple")),
    },
    TypePreview::Lpg { .. } => match tuple {
      [Value::Node(_)] | [Value::Edge(_)] => Ok(()),
      _ => Err(ActivityError::execution("graph pipe expects one node or edge per tuple")),
    },
    _ => Ok(()),
  }
}

/// Pushes every record of `reader` into `output`, then closes it.
#[instrument(level = "trace", skip(reader, output))]
pub async fn feed_from_reader(
  reader: &dyn CheckpointReader,
  mut output: OutputPipe,
) -> ActivityResult<usize> {
  for tuple in reader.iter() {
    output.put(tuple).await?;
  }
  trace!(sent = output.sent(), "reader feed finished");
  Ok(output.sent())
}

/// Drains `input` into `writer` until end-of-stream.
#[instrument(level = "trace", skip(input, writer))]
pub async fn drain_into(
  mut input: InputPipe,
  writer: &mut dyn CheckpointWriter,
) -> ActivityResult<usize> {
  while let Some(tuple) = input.next().await? {
    writer.write_tuple(tuple)?;
  }
  trace!(received = input.received(), "pipe drained");
  Ok(input.received())
}
