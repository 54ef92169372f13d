// core/src/error.rs

use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Engine-level failures raised by `flow::Pipeline` itself.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Error in pipeline handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerError { source: err }
  }
}

/// Failures from the storage backends (Postgres, Redis, in-memory).
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Key-value store error: {0}")]
  KeyValue(#[from] redis::RedisError),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Internal store error: {0}")]
  Internal(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
