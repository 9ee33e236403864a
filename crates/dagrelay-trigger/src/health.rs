//! Pre-flight health gate.
//!
//! Before every trigger the orchestrator's `/health` endpoint is probed. The
//! expected body maps component names to a status object:
//!
//! ```json
//! {
//!   "metadatabase": { "status": "healthy" },
//!   "scheduler": { "status": "healthy", "latest_scheduler_heartbeat": "..." }
//! }
//! ```
//!
//! The gate fails closed: network errors, timeouts, non-2xx responses and
//! malformed bodies all count as unhealthy.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dagrelay_config::{Credentials, TriggerConfig};
use dagrelay_http::{HttpRequest, Transport};
use tracing::{debug, warn};

/// Component status string reported by a healthy orchestrator.
pub const HEALTHY_STATUS: &str = "healthy";

/// Whether a health response body reports every component healthy.
///
/// An empty report carries no evidence of health and is treated as unhealthy.
pub fn is_healthy_report(body: &str) -> bool {
  let Ok(serde_json::Value::Object(components)) = serde_json::from_str(body) else {
    return false;
  };

  !components.is_empty()
    && components.values().all(|component| {
      component
        .get("status")
        .and_then(|s| s.as_str())
        .is_some_and(|s| s.eq_ignore_ascii_case(HEALTHY_STATUS))
    })
}

/// Circuit breaker consulted before each trigger.
///
/// Each call probes afresh unless a cache TTL is configured, in which case a
/// probe result is reused until it is older than the TTL.
pub struct HealthGate {
  transport: Arc<dyn Transport>,
  url: String,
  credentials: Credentials,
  timeout: Duration,
  cache_ttl: Duration,
  last_probe: Mutex<Option<(Instant, bool)>>,
}

impl HealthGate {
  pub fn new(transport: Arc<dyn Transport>, config: &TriggerConfig) -> Self {
    Self {
      transport,
      url: config.health_url(),
      credentials: config.credentials.clone(),
      timeout: config.health_timeout,
      cache_ttl: config.health_cache_ttl,
      last_probe: Mutex::new(None),
    }
  }

  pub async fn healthy(&self) -> bool {
    if let Some(healthy) = self.cached() {
      debug!(healthy, "health gate result cached");
      return healthy;
    }

    let healthy = self.probe().await;

    if !self.cache_ttl.is_zero() {
      if let Ok(mut last) = self.last_probe.lock() {
        *last = Some((Instant::now(), healthy));
      }
    }

    healthy
  }

  fn cached(&self) -> Option<bool> {
    if self.cache_ttl.is_zero() {
      return None;
    }

    let last = self.last_probe.lock().ok()?;
    match *last {
      Some((at, healthy)) if at.elapsed() < self.cache_ttl => Some(healthy),
      _ => None,
    }
  }

  async fn probe(&self) -> bool {
    let request = HttpRequest::get(&self.url)
      .credentials(&self.credentials)
      .timeout(self.timeout);

    match self.transport.send(request).await {
      Ok(response) if response.is_success() => {
        let healthy = is_healthy_report(&response.body);
        if !healthy {
          warn!(url = %self.url, body = %response.body, "orchestrator reports unhealthy");
        }
        healthy
      }
      Ok(response) => {
        warn!(url = %self.url, status = response.status, "health probe rejected");
        false
      }
      Err(e) => {
        warn!(url = %self.url, error = %e, "health probe failed");
        false
      }
    }
  }
}
