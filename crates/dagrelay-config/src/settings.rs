use std::path::PathBuf;
use std::time::Duration;

use crate::credentials::Credentials;

/// How the trigger engine reaches the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerConfig {
  /// Orchestrator base URL, e.g. `http://airflow:8080`.
  pub base_url: String,
  pub credentials: Credentials,
  /// Maximum number of trigger attempts per event (at least one is always made).
  pub max_retries: u32,
  /// Base delay for exponential backoff between attempts.
  pub backoff_factor: Duration,
  /// Per-attempt timeout for the trigger request.
  pub request_timeout: Duration,
  /// Timeout for the health probe.
  pub health_timeout: Duration,
  /// How long a health probe result may be reused. Zero probes on every trigger.
  pub health_cache_ttl: Duration,
  /// Append-only dead-letter log. `None` disables dead-lettering.
  pub dead_letter_path: Option<PathBuf>,
}

impl TriggerConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      ..Self::default()
    }
  }

  /// Base URL without trailing slashes.
  pub fn base_url(&self) -> &str {
    self.base_url.trim_end_matches('/')
  }

  /// `{base_url}/api/v1/dags/{workflow_id}/dagRuns`
  pub fn dag_runs_url(&self, workflow_id: &str) -> String {
    format!("{}/api/v1/dags/{}/dagRuns", self.base_url(), workflow_id)
  }

  /// `{base_url}/health`
  pub fn health_url(&self) -> String {
    format!("{}/health", self.base_url())
  }
}

impl Default for TriggerConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8080".to_string(),
      credentials: Credentials::None,
      max_retries: 3,
      backoff_factor: Duration::from_millis(500),
      request_timeout: Duration::from_secs(10),
      health_timeout: Duration::from_secs(5),
      health_cache_ttl: Duration::ZERO,
      dead_letter_path: None,
    }
  }
}
