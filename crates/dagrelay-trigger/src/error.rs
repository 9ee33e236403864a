//! Trigger error taxonomy.

/// Counter label a finished trigger is bucketed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
  Success,
  Unauthorized,
  Error,
  Ignored,
  CircuitOpen,
}

impl Outcome {
  pub const ALL: [Outcome; 5] = [
    Outcome::Success,
    Outcome::Unauthorized,
    Outcome::Error,
    Outcome::Ignored,
    Outcome::CircuitOpen,
  ];

  /// Value of the `status` label on `airflow_trigger_total`.
  pub fn as_label(&self) -> &'static str {
    match self {
      Outcome::Success => "success",
      Outcome::Unauthorized => "unauthorized",
      Outcome::Error => "error",
      Outcome::Ignored => "ignored",
      Outcome::CircuitOpen => "circuit_open",
    }
  }
}

/// Errors that can occur while triggering a workflow run.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
  /// The event's type is not in the mapping table. Never retried.
  #[error("event type {} not whitelisted", .event_type.as_deref().unwrap_or("<missing>"))]
  Unmapped { event_type: Option<String> },

  /// The orchestrator health gate reported unhealthy; no request was sent.
  #[error("orchestrator unhealthy, not triggering '{workflow_id}'")]
  CircuitOpen { workflow_id: String },

  /// The orchestrator rejected our credentials (401/403). Never retried.
  #[error("unauthorized to trigger '{workflow_id}' (HTTP {status}): {body}")]
  Unauthorized {
    workflow_id: String,
    status: u16,
    body: String,
  },

  /// Retries exhausted on transient failures, or a terminal non-2xx response.
  #[error("failed to trigger '{workflow_id}' after {attempts} attempt(s): {reason}")]
  TriggerFailed {
    workflow_id: String,
    attempts: u32,
    reason: String,
  },

  /// The caller cancelled the trigger.
  #[error("trigger cancelled")]
  Cancelled,
}

impl TriggerError {
  pub fn outcome(&self) -> Outcome {
    match self {
      TriggerError::Unmapped { .. } => Outcome::Ignored,
      TriggerError::CircuitOpen { .. } => Outcome::CircuitOpen,
      TriggerError::Unauthorized { .. } => Outcome::Unauthorized,
      TriggerError::TriggerFailed { .. } | TriggerError::Cancelled => Outcome::Error,
    }
  }
}
