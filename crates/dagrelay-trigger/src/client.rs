//! Trigger client.

use std::sync::Arc;
use std::time::Instant;

use dagrelay_config::{Event, MappingTable, TriggerConfig};
use dagrelay_dead_letter::{DeadLetterEntry, DeadLetterStore, JsonlStore};
use dagrelay_http::{HttpRequest, Transport};
use dagrelay_resolver::{derive_run_id, resolve_conf};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Outcome, TriggerError};
use crate::health::HealthGate;
use crate::metrics::TriggerMetrics;
use crate::retry::{AttemptFailure, Decision, RetryPolicy, classify};

/// Header carrying the per-invocation correlation id.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Conf key the correlation id is injected under.
const CORRELATION_ID_CONF_KEY: &str = "correlation_id";

/// Everything derived from the event before any request is sent.
struct Plan {
  workflow_id: String,
  run_id: String,
  conf: Map<String, Value>,
}

impl Plan {
  fn body(&self) -> Value {
    json!({
      "dag_run_id": self.run_id,
      "conf": self.conf,
    })
  }
}

/// Triggers workflow runs for whitelisted events.
///
/// A client is safe to share across tasks: the mapping table is read-only,
/// metrics handles are atomic, and each call keeps its own retry state.
pub struct TriggerClient {
  config: TriggerConfig,
  mappings: Arc<MappingTable>,
  transport: Arc<dyn Transport>,
  health: HealthGate,
  retry: RetryPolicy,
  metrics: TriggerMetrics,
  dead_letter: Option<Arc<dyn DeadLetterStore>>,
}

impl TriggerClient {
  /// Create a client. When `config.dead_letter_path` is set, failures are
  /// appended to a [`JsonlStore`] at that path.
  pub fn new(
    config: TriggerConfig,
    mappings: MappingTable,
    transport: Arc<dyn Transport>,
    metrics: TriggerMetrics,
  ) -> Self {
    let dead_letter = config
      .dead_letter_path
      .as_ref()
      .map(|path| Arc::new(JsonlStore::new(path)) as Arc<dyn DeadLetterStore>);

    Self {
      health: HealthGate::new(transport.clone(), &config),
      retry: RetryPolicy::new(config.max_retries, config.backoff_factor),
      mappings: Arc::new(mappings),
      config,
      transport,
      metrics,
      dead_letter,
    }
  }

  /// Send failures to `store` instead of the configured path.
  pub fn with_dead_letter(mut self, store: Arc<dyn DeadLetterStore>) -> Self {
    self.dead_letter = Some(store);
    self
  }

  /// Disable dead-lettering.
  pub fn without_dead_letter(mut self) -> Self {
    self.dead_letter = None;
    self
  }

  pub fn config(&self) -> &TriggerConfig {
    &self.config
  }

  pub fn mappings(&self) -> &MappingTable {
    &self.mappings
  }

  pub fn metrics(&self) -> &TriggerMetrics {
    &self.metrics
  }

  /// Trigger the workflow mapped to `event`, returning its run id.
  ///
  /// A fresh correlation id is generated for the call.
  pub async fn trigger(
    &self,
    event: &Event,
    cancel: CancellationToken,
  ) -> Result<String, TriggerError> {
    let correlation_id = uuid::Uuid::new_v4().to_string();
    self
      .trigger_with_correlation_id(event, &correlation_id, cancel)
      .await
  }

  /// Trigger with a caller-supplied correlation id.
  #[instrument(
    name = "trigger",
    skip(self, event, cancel),
    fields(correlation_id = %correlation_id)
  )]
  pub async fn trigger_with_correlation_id(
    &self,
    event: &Event,
    correlation_id: &str,
    cancel: CancellationToken,
  ) -> Result<String, TriggerError> {
    let started = Instant::now();
    self.metrics.record_started();

    let result = match self.plan(event, correlation_id) {
      Ok(plan) => match self.dispatch(&plan, correlation_id, &cancel).await {
        Ok(()) => Ok(plan.run_id),
        Err(e) => Err((e, Some(plan))),
      },
      Err(e) => Err((e, None)),
    };

    let result = match result {
      Ok(run_id) => {
        self.metrics.record_outcome(Outcome::Success);
        info!(run_id = %run_id, "trigger succeeded");
        Ok(run_id)
      }
      Err((e, plan)) => {
        self.metrics.record_outcome(e.outcome());
        self.metrics.record_failure();
        error!(
          workflow_id = plan.as_ref().map(|p| p.workflow_id.as_str()),
          run_id = plan.as_ref().map(|p| p.run_id.as_str()),
          outcome = e.outcome().as_label(),
          error = %e,
          "trigger failed"
        );
        self.dead_letter(event, correlation_id, plan, &e).await;
        Err(e)
      }
    };

    self.metrics.observe_latency(started.elapsed());
    result
  }

  fn plan(&self, event: &Event, correlation_id: &str) -> Result<Plan, TriggerError> {
    let entry = event
      .event_type()
      .and_then(|event_type| self.mappings.get(event_type))
      .ok_or_else(|| TriggerError::Unmapped {
        event_type: event.event_type().map(str::to_string),
      })?;

    let mut conf = resolve_conf(&entry.conf, event);
    conf.insert(
      CORRELATION_ID_CONF_KEY.to_string(),
      Value::String(correlation_id.to_string()),
    );

    Ok(Plan {
      workflow_id: entry.workflow_id.clone(),
      run_id: derive_run_id(&entry.workflow_id, event),
      conf,
    })
  }

  async fn dispatch(
    &self,
    plan: &Plan,
    correlation_id: &str,
    cancel: &CancellationToken,
  ) -> Result<(), TriggerError> {
    info!(workflow_id = %plan.workflow_id, run_id = %plan.run_id, "trigger started");

    if cancel.is_cancelled() {
      return Err(TriggerError::Cancelled);
    }

    let healthy = tokio::select! {
      _ = cancel.cancelled() => return Err(TriggerError::Cancelled),
      healthy = self.health.healthy() => healthy,
    };
    if !healthy {
      return Err(TriggerError::CircuitOpen {
        workflow_id: plan.workflow_id.clone(),
      });
    }

    let url = self.config.dag_runs_url(&plan.workflow_id);
    let body = plan.body();
    let mut attempt = 0;

    loop {
      attempt += 1;

      let request = HttpRequest::post_json(&url, body.clone())
        .header(CORRELATION_ID_HEADER, correlation_id)
        .credentials(&self.config.credentials)
        .timeout(self.config.request_timeout);

      let result = tokio::select! {
        _ = cancel.cancelled() => return Err(TriggerError::Cancelled),
        result = self.transport.send(request) => result,
      };
      let status = result.as_ref().ok().map(|response| response.status);

      let failure = match classify(result) {
        Ok(_) => {
          debug!(
            workflow_id = %plan.workflow_id,
            run_id = %plan.run_id,
            attempt,
            status,
            "trigger attempt accepted"
          );
          return Ok(());
        }
        Err(failure) => failure,
      };

      warn!(
        workflow_id = %plan.workflow_id,
        run_id = %plan.run_id,
        attempt,
        status,
        error = %failure,
        "trigger attempt failed"
      );

      match self.retry.decide(attempt, &failure) {
        Decision::Retry(delay) => {
          tokio::select! {
            _ = cancel.cancelled() => return Err(TriggerError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
          }
        }
        Decision::GiveUp => return Err(give_up(&plan.workflow_id, attempt, failure)),
      }
    }
  }

  /// Best-effort: a failing store is logged, never surfaced.
  async fn dead_letter(
    &self,
    event: &Event,
    correlation_id: &str,
    plan: Option<Plan>,
    err: &TriggerError,
  ) {
    let Some(store) = &self.dead_letter else {
      return;
    };

    let entry = match plan {
      Some(plan) => DeadLetterEntry::new(
        event.clone(),
        Some(plan.workflow_id),
        Some(plan.run_id),
        err.to_string(),
      )
      .with_conf(plan.conf),
      None => DeadLetterEntry::new(event.clone(), None, None, err.to_string()),
    }
    .with_correlation_id(correlation_id);

    match store.append(&entry).await {
      Ok(()) => info!(
        workflow_id = entry.workflow_id.as_deref(),
        run_id = entry.run_id.as_deref(),
        "dead letter recorded"
      ),
      Err(e) => error!(error = %e, "failed to record dead letter"),
    }
  }
}

fn give_up(workflow_id: &str, attempts: u32, failure: AttemptFailure) -> TriggerError {
  let workflow_id = workflow_id.to_string();
  match failure {
    AttemptFailure::Unauthorized { status, body } => TriggerError::Unauthorized {
      workflow_id,
      status,
      body,
    },
    AttemptFailure::Transient { reason } => TriggerError::TriggerFailed {
      workflow_id,
      attempts,
      reason,
    },
    terminal @ AttemptFailure::Terminal { .. } => TriggerError::TriggerFailed {
      workflow_id,
      attempts,
      reason: terminal.to_string(),
    },
  }
}
