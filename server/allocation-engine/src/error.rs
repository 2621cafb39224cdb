//! Structured error types for the allocation engine.
//!
//! Numeric problems inside the allocation pipeline (NaN weights, bad policy
//! fields) are recovered locally and logged; only caller misuse and
//! conditions the caller must act on surface here.

use thiserror::Error;

use crate::scope::ScopeViolation;

#[derive(Debug, Error)]
pub enum AllocationError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("duplicate unit id: {id}")]
  DuplicateUnit { id: String },

  #[error("unknown unit id: {id}")]
  UnknownUnit { id: String },

  #[error("manual hours for {id} must be a positive number, got {hours}")]
  InvalidManualHours { id: String, hours: f64 },

  #[error("cannot redistribute {scope}: {reason}")]
  CannotRedistribute { scope: String, reason: String },

  #[error("scope validation failed: {}", summarize(.0))]
  ScopeViolations(Vec<ScopeViolation>),

  #[error("parse: {0}")]
  Parse(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl AllocationError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn parse(msg: impl Into<String>) -> Self {
    Self::Parse(msg.into())
  }

  pub fn cannot_redistribute(scope: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::CannotRedistribute {
      scope: scope.into(),
      reason: reason.into(),
    }
  }

  /// True for conditions the caller should present and move on from.
  pub fn is_recoverable(&self) -> bool {
    matches!(self, Self::CannotRedistribute { .. } | Self::ScopeViolations(_))
  }
}

fn summarize(violations: &[ScopeViolation]) -> String {
  violations
    .iter()
    .map(|v| v.to_string())
    .collect::<Vec<_>>()
    .join("; ")
}
