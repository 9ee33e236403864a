//! Shared fixtures for the trigger integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dagrelay_config::{Event, MappingTable, TriggerConfig};
use dagrelay_dead_letter::{DeadLetterEntry, DeadLetterError, DeadLetterStore, StoredLine};
use dagrelay_http::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use serde_json::{Value, json};

pub const HEALTHY_BODY: &str =
  r#"{"metadatabase": {"status": "healthy"}, "scheduler": {"status": "healthy"}}"#;

/// Transport that records every request and replays canned responses.
///
/// GET requests are answered from the health script, POST requests from the
/// trigger script. An exhausted script answers healthy / 200.
#[derive(Default)]
pub struct FakeTransport {
  health: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
  triggers: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
  requests: Mutex<Vec<HttpRequest>>,
  hang_triggers: bool,
}

impl FakeTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// POST requests never complete.
  pub fn hanging() -> Self {
    Self {
      hang_triggers: true,
      ..Self::default()
    }
  }

  pub fn push_health(&self, status: u16, body: &str) {
    self
      .health
      .lock()
      .unwrap()
      .push_back(Ok(HttpResponse::new(status, body)));
  }

  pub fn push_trigger(&self, status: u16, body: &str) {
    self
      .triggers
      .lock()
      .unwrap()
      .push_back(Ok(HttpResponse::new(status, body)));
  }

  pub fn push_trigger_error(&self, error: TransportError) {
    self.triggers.lock().unwrap().push_back(Err(error));
  }

  pub fn requests(&self) -> Vec<HttpRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn trigger_requests(&self) -> Vec<HttpRequest> {
    self
      .requests()
      .into_iter()
      .filter(|r| r.method == Method::Post)
      .collect()
  }

  pub fn health_requests(&self) -> Vec<HttpRequest> {
    self
      .requests()
      .into_iter()
      .filter(|r| r.method == Method::Get)
      .collect()
  }
}

#[async_trait]
impl Transport for FakeTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let method = request.method;
    self.requests.lock().unwrap().push(request);

    match method {
      Method::Get => {
        let next = self.health.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(HttpResponse::new(200, HEALTHY_BODY)))
      }
      Method::Post => {
        if self.hang_triggers {
          std::future::pending::<()>().await;
        }
        let next = self.triggers.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(HttpResponse::new(200, "{}")))
      }
    }
  }
}

/// Dead-letter store whose every operation fails.
pub struct FailingStore;

#[async_trait]
impl DeadLetterStore for FailingStore {
  async fn append(&self, _entry: &DeadLetterEntry) -> Result<(), DeadLetterError> {
    Err(std::io::Error::other("disk full").into())
  }

  async fn load(&self) -> Result<Vec<StoredLine>, DeadLetterError> {
    Err(std::io::Error::other("disk full").into())
  }

  async fn replace(&self, _lines: &[StoredLine]) -> Result<(), DeadLetterError> {
    Err(std::io::Error::other("disk full").into())
  }
}

pub fn mappings() -> MappingTable {
  serde_json::from_value(json!({
    "sample_event": {"dag_id": "d1", "conf": {"foo": "{{bar}}"}},
    "other_event": {"dag_id": "d2"}
  }))
  .unwrap()
}

/// Config with no backoff delay so retry tests run instantly.
pub fn config(max_retries: u32) -> TriggerConfig {
  TriggerConfig {
    base_url: "http://airflow.test:8080/".to_string(),
    max_retries,
    backoff_factor: Duration::ZERO,
    ..TriggerConfig::default()
  }
}

pub fn event(value: Value) -> Event {
  Event::try_from(value).unwrap()
}

pub fn sample_event() -> Event {
  event(json!({"type": "sample_event", "bar": "baz"}))
}
