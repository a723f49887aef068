//! Structured error types for the scoring engine.

use thiserror::Error;
use uuid::Uuid;

use crate::types::{InningsNumber, Slot};

#[derive(Debug, Error)]
pub enum ScoringError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("not found: {entity} {id}")]
  NotFound { entity: &'static str, id: String },

  #[error("sequence: expected {expected}, got {got}")]
  Sequence { expected: Slot, got: Slot },

  #[error("match complete: innings {innings} of match {match_id} is closed")]
  MatchComplete { match_id: Uuid, innings: InningsNumber },

  #[error("storage unavailable: {0}")]
  StorageUnavailable(String),

  #[error("config: {0}")]
  Config(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl ScoringError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    Self::NotFound {
      entity,
      id: id.to_string(),
    }
  }

  /// Stable machine-readable error code.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Validation { .. } => "validation",
      Self::NotFound { .. } => "not_found",
      Self::Sequence { .. } => "sequence",
      Self::MatchComplete { .. } => "match_complete",
      Self::StorageUnavailable(_) => "storage_unavailable",
      Self::Config(_) => "config",
      Self::Json(_) => "json",
    }
  }

  /// Only transient storage failures are safe to resubmit unchanged.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::StorageUnavailable(_))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::BallPosition;

  #[test]
  fn sequence_message_names_both_positions() {
    let err = ScoringError::Sequence {
      expected: Slot::new(InningsNumber::First, BallPosition::new(0, 2)),
      got: Slot::new(InningsNumber::First, BallPosition::new(0, 1)),
    };
    assert_eq!(
      err.to_string(),
      "sequence: expected innings 1 ball 0.2, got innings 1 ball 0.1"
    );
    assert_eq!(err.kind(), "sequence");
    assert!(!err.is_retryable());
  }

  #[test]
  fn only_storage_errors_are_retryable() {
    assert!(ScoringError::StorageUnavailable("lock timeout".into()).is_retryable());
    assert!(!ScoringError::validation("innings", "must be 1 or 2").is_retryable());
    assert!(!ScoringError::not_found("match", Uuid::nil()).is_retryable());
  }
}
