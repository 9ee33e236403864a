//! Prometheus handles for the trigger engine.
//!
//! Metric names and labels are consumed by existing dashboards and must not
//! change:
//! - `airflow_trigger_total{status}` - finished triggers by [`Outcome`]
//! - `triggers_total` - trigger invocations
//! - `trigger_failures_total` - failed invocations (once per call, not per retry)
//! - `latency_ms` - invocation latency including retries and backoff

use std::time::Duration;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

use crate::error::Outcome;

/// Latency buckets in milliseconds.
const LATENCY_BUCKETS_MS: &[f64] = &[
  5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
];

/// Metric handles shared by every trigger of a process.
///
/// Cloning is cheap; clones update the same underlying series, and
/// concurrent updates are lock-free atomics.
#[derive(Clone)]
pub struct TriggerMetrics {
  registry: Registry,
  outcomes: IntCounterVec,
  triggers_total: IntCounter,
  failures_total: IntCounter,
  latency_ms: Histogram,
}

impl TriggerMetrics {
  /// Create handles registered in a fresh private registry.
  pub fn new() -> Result<Self, prometheus::Error> {
    Self::with_registry(Registry::new())
  }

  /// Create handles registered in `registry`.
  ///
  /// Fails if the registry already holds metrics with these names.
  pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
    let outcomes = IntCounterVec::new(
      Opts::new("airflow_trigger_total", "Total Airflow trigger events"),
      &["status"],
    )?;
    let triggers_total = IntCounter::new("triggers_total", "Total trigger attempts")?;
    let failures_total = IntCounter::new("trigger_failures_total", "Total trigger failures")?;
    let latency_ms = Histogram::with_opts(
      HistogramOpts::new("latency_ms", "Trigger latency in milliseconds")
        .buckets(LATENCY_BUCKETS_MS.to_vec()),
    )?;

    registry.register(Box::new(outcomes.clone()))?;
    registry.register(Box::new(triggers_total.clone()))?;
    registry.register(Box::new(failures_total.clone()))?;
    registry.register(Box::new(latency_ms.clone()))?;

    // Export every status from the start so dashboards see zeros
    for outcome in Outcome::ALL {
      outcomes.with_label_values(&[outcome.as_label()]);
    }

    Ok(Self {
      registry,
      outcomes,
      triggers_total,
      failures_total,
      latency_ms,
    })
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  /// Render the registry in the Prometheus text exposition format.
  pub fn render(&self) -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    let encoder = prometheus::TextEncoder::new();
    encoder.encode(&self.registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
  }

  pub(crate) fn record_started(&self) {
    self.triggers_total.inc();
  }

  pub(crate) fn record_outcome(&self, outcome: Outcome) {
    self.outcomes.with_label_values(&[outcome.as_label()]).inc();
  }

  pub(crate) fn record_failure(&self) {
    self.failures_total.inc();
  }

  pub(crate) fn observe_latency(&self, elapsed: Duration) {
    self.latency_ms.observe(elapsed.as_secs_f64() * 1000.0);
  }

  pub fn outcome_count(&self, outcome: Outcome) -> u64 {
    self.outcomes.with_label_values(&[outcome.as_label()]).get()
  }

  pub fn triggers_total(&self) -> u64 {
    self.triggers_total.get()
  }

  pub fn failures_total(&self) -> u64 {
    self.failures_total.get()
  }

  /// Number of latency observations recorded.
  pub fn latency_samples(&self) -> u64 {
    self.latency_ms.get_sample_count()
  }
}
