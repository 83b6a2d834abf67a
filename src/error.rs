//! Error type shared by previews, settings binding, checkpoints, pipes and execution.

use thiserror::Error;

/// Result alias used across the crate.
pub type ActivityResult<T> = Result<T, ActivityError>;

/// Coarse failure class the scheduler matches on to decide retry/abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Input model or shape incompatible with a port; fails DAG validation.
  TypeMismatch,
  /// Missing or out-of-range setting; fails before execution.
  SettingsBinding,
  /// An upstream branch produced no checkpoint where one was required.
  InputFailure,
  /// Anything raised while executing or piping.
  ExecutionFailure,
  /// Cooperative abort.
  Cancellation,
}

/// Errors raised by activities and the machinery around them.
#[derive(Debug, Error)]
pub enum ActivityError {
  #[error("type mismatch on port {port}: expected {expected}, got {actual}")]
  TypeMismatch {
    port: usize,
    expected: String,
    actual: String,
  },

  #[error("invalid setting '{key}': {reason}")]
  SettingsBinding { key: String, reason: String },

  #[error("input {port} is not available: {reason}")]
  InputFailure { port: usize, reason: String },

  #[error("execution failed: {0}")]
  Execution(String),

  #[error("storage error: {0}")]
  Storage(String),

  /// The other end of a pipe went away before the stream finished.
  #[error("pipe closed")]
  PipeClosed,

  #[error("writer for output {0} is already closed")]
  WriterClosed(usize),

  #[error("cancelled")]
  Cancelled,

  #[error("unknown activity type '{0}'")]
  UnknownActivity(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

impl ActivityError {
  pub fn type_mismatch(port: usize, expected: impl Into<String>, actual: impl Into<String>) -> Self {
    Self::TypeMismatch {
      port,
      expected: expected.into(),
      actual: actual.into(),
    }
  }

  pub fn settings(key: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::SettingsBinding {
      key: key.into(),
      reason: reason.into(),
    }
  }

  pub fn input_failure(port: usize, reason: impl Into<String>) -> Self {
    Self::InputFailure {
      port,
      reason: reason.into(),
    }
  }

  pub fn execution(msg: impl Into<String>) -> Self {
    Self::Execution(msg.into())
  }

  pub fn storage(msg: impl Into<String>) -> Self {
    Self::Storage(msg.into())
  }

  /// Classifies the error for the scheduler.
  ///
  /// Storage, pipe and I/O problems raised during a run are all execution failures;
  /// an unknown activity type can only surface while building the DAG, so it is
  /// reported with the settings-binding class.
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
      Self::SettingsBinding { .. } | Self::UnknownActivity(_) => ErrorKind::SettingsBinding,
      Self::InputFailure { .. } => ErrorKind::InputFailure,
      Self::Cancelled => ErrorKind::Cancellation,
      Self::Execution(_)
      | Self::Storage(_)
      | Self::PipeClosed
      | Self::WriterClosed(_)
      | Self::Io(_)
      | Self::Json(_) => ErrorKind::ExecutionFailure,
    }
  }

  pub fn is_cancellation(&self) -> bool {
    self.kind() == ErrorKind::Cancellation
  }
}
