//! Integration tests for TriggerClient against a scripted transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FailingStore, FakeTransport, config, event, mappings, sample_event};
use dagrelay_config::{Credentials, TriggerConfig};
use dagrelay_dead_letter::{DeadLetterEntry, DeadLetterStore, JsonlStore, StoredLine};
use dagrelay_http::TransportError;
use dagrelay_resolver::derive_run_id;
use dagrelay_trigger::{
  CORRELATION_ID_HEADER, Outcome, TriggerClient, TriggerError, TriggerMetrics,
};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn client(transport: &Arc<FakeTransport>, config: TriggerConfig) -> TriggerClient {
  TriggerClient::new(
    config,
    mappings(),
    transport.clone(),
    TriggerMetrics::new().unwrap(),
  )
}

fn client_with_store(
  transport: &Arc<FakeTransport>,
  config: TriggerConfig,
) -> (TriggerClient, Arc<JsonlStore>, TempDir) {
  let dir = TempDir::new().unwrap();
  let store = Arc::new(JsonlStore::new(dir.path().join("dlq.jsonl")));
  let client = client(transport, config).with_dead_letter(store.clone());
  (client, store, dir)
}

async fn dead_letters(store: &JsonlStore) -> Vec<DeadLetterEntry> {
  store
    .load()
    .await
    .unwrap()
    .into_iter()
    .map(|line| match line {
      StoredLine::Entry(entry) => entry,
      StoredLine::Malformed(raw) => panic!("unexpected malformed line: {}", raw),
    })
    .collect()
}

#[tokio::test]
async fn test_end_to_end_resolves_conf() {
  let transport = Arc::new(FakeTransport::new());
  let client = client(&transport, config(3));
  let event = sample_event();

  let run_id = client
    .trigger(&event, CancellationToken::new())
    .await
    .expect("trigger should succeed");

  assert!(run_id.starts_with("d1-"));
  assert_eq!(run_id.len(), "d1-".len() + 8);
  assert_eq!(run_id, derive_run_id("d1", &event));

  let requests = transport.trigger_requests();
  assert_eq!(requests.len(), 1);
  let request = &requests[0];
  assert_eq!(
    request.url,
    "http://airflow.test:8080/api/v1/dags/d1/dagRuns"
  );
  assert_eq!(request.header_value("content-type"), Some("application/json"));

  let body = request.body.as_ref().unwrap();
  assert_eq!(body["dag_run_id"], json!(run_id));
  assert_eq!(body["conf"]["foo"], "baz");

  let correlation_id = request.header_value(CORRELATION_ID_HEADER).unwrap();
  assert_eq!(body["conf"]["correlation_id"], json!(correlation_id));

  let metrics = client.metrics();
  assert_eq!(metrics.outcome_count(Outcome::Success), 1);
  assert_eq!(metrics.triggers_total(), 1);
  assert_eq!(metrics.failures_total(), 0);
  assert_eq!(metrics.latency_samples(), 1);
}

#[tokio::test]
async fn test_health_probe_precedes_trigger() {
  let transport = Arc::new(FakeTransport::new());
  let client = client(&transport, config(3));

  client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap();

  let requests = transport.requests();
  assert_eq!(requests.len(), 2);
  assert_eq!(requests[0].url, "http://airflow.test:8080/health");
  assert_eq!(requests[0].timeout, TriggerConfig::default().health_timeout);
  assert_eq!(requests[1].timeout, TriggerConfig::default().request_timeout);
}

#[tokio::test]
async fn test_retries_server_errors_then_succeeds() {
  let transport = Arc::new(FakeTransport::new());
  transport.push_trigger(503, "busy");
  transport.push_trigger(500, "boom");
  let client = client(&transport, config(3));

  let run_id = client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap();

  let requests = transport.trigger_requests();
  assert_eq!(requests.len(), 3);
  for request in &requests {
    assert_eq!(request.body.as_ref().unwrap()["dag_run_id"], json!(run_id));
  }
  assert_eq!(client.metrics().failures_total(), 0);
  assert_eq!(client.metrics().outcome_count(Outcome::Success), 1);
}

#[tokio::test]
async fn test_transport_errors_are_retried() {
  let transport = Arc::new(FakeTransport::new());
  transport.push_trigger_error(TransportError::Timeout {
    url: "http://airflow.test:8080".to_string(),
    timeout_ms: 10_000,
  });
  let client = client(&transport, config(2));

  client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(transport.trigger_requests().len(), 2);
}

#[tokio::test]
async fn test_exhausted_retries_fail_and_dead_letter() {
  let transport = Arc::new(FakeTransport::new());
  for _ in 0..3 {
    transport.push_trigger(502, "bad gateway");
  }
  let (client, store, _dir) = client_with_store(&transport, config(3));
  let event = sample_event();

  let err = client
    .trigger(&event, CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    TriggerError::TriggerFailed { attempts: 3, ref workflow_id, .. } if workflow_id == "d1"
  ));
  assert_eq!(transport.trigger_requests().len(), 3);

  let metrics = client.metrics();
  assert_eq!(metrics.failures_total(), 1);
  assert_eq!(metrics.outcome_count(Outcome::Error), 1);
  assert_eq!(metrics.latency_samples(), 1);

  let entries = dead_letters(&store).await;
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].event, event);
  assert_eq!(entries[0].workflow_id.as_deref(), Some("d1"));
  assert_eq!(entries[0].run_id, Some(derive_run_id("d1", &event)));
  assert_eq!(entries[0].error, err.to_string());
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
  let transport = Arc::new(FakeTransport::new());
  transport.push_trigger(401, "bad token");
  let (client, store, _dir) = client_with_store(&transport, config(5));

  let err = client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, TriggerError::Unauthorized { status: 401, .. }));
  assert_eq!(transport.trigger_requests().len(), 1);
  assert_eq!(client.metrics().outcome_count(Outcome::Unauthorized), 1);
  assert_eq!(client.metrics().failures_total(), 1);
  assert_eq!(dead_letters(&store).await.len(), 1);
}

#[tokio::test]
async fn test_terminal_status_is_not_retried() {
  let transport = Arc::new(FakeTransport::new());
  transport.push_trigger(404, "DAG not found");
  let client = client(&transport, config(5));

  let err = client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, TriggerError::TriggerFailed { attempts: 1, .. }));
  assert!(err.to_string().contains("HTTP 404"));
  assert_eq!(transport.trigger_requests().len(), 1);
}

#[tokio::test]
async fn test_unmapped_event_sends_nothing() {
  let transport = Arc::new(FakeTransport::new());
  let (client, store, _dir) = client_with_store(&transport, config(3));
  let event = event(json!({"type": "unknown_event"}));

  let err = client
    .trigger(&event, CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    TriggerError::Unmapped { event_type: Some(ref t) } if t == "unknown_event"
  ));
  assert!(transport.requests().is_empty());

  let metrics = client.metrics();
  assert_eq!(metrics.outcome_count(Outcome::Ignored), 1);
  assert_eq!(metrics.failures_total(), 1);
  assert_eq!(metrics.triggers_total(), 1);

  let entries = dead_letters(&store).await;
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].workflow_id, None);
  assert_eq!(entries[0].run_id, None);
}

#[tokio::test]
async fn test_event_without_type_is_unmapped() {
  let transport = Arc::new(FakeTransport::new());
  let client = client(&transport, config(3));

  let err = client
    .trigger(&event(json!({"bar": "baz"})), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, TriggerError::Unmapped { event_type: None }));
  assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_unhealthy_orchestrator_opens_circuit() {
  let transport = Arc::new(FakeTransport::new());
  transport.push_health(
    200,
    r#"{"metadatabase": {"status": "healthy"}, "scheduler": {"status": "unhealthy"}}"#,
  );
  let (client, store, _dir) = client_with_store(&transport, config(3));

  let err = client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, TriggerError::CircuitOpen { ref workflow_id } if workflow_id == "d1"));
  assert!(transport.trigger_requests().is_empty());
  assert_eq!(client.metrics().failures_total(), 1);
  assert_eq!(client.metrics().outcome_count(Outcome::CircuitOpen), 1);

  let entries = dead_letters(&store).await;
  assert_eq!(entries.len(), 1);
  assert!(entries[0].run_id.is_some());
}

#[tokio::test]
async fn test_failed_health_probe_opens_circuit() {
  let transport = Arc::new(FakeTransport::new());
  transport.push_health(503, "");
  let client = client(&transport, config(3));

  let err = client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, TriggerError::CircuitOpen { .. }));
  assert!(transport.trigger_requests().is_empty());
}

#[tokio::test]
async fn test_health_probe_is_cached_within_ttl() {
  let transport = Arc::new(FakeTransport::new());
  let mut config = config(3);
  config.health_cache_ttl = Duration::from_secs(60);
  let client = client(&transport, config);

  for _ in 0..3 {
    client
      .trigger(&sample_event(), CancellationToken::new())
      .await
      .unwrap();
  }

  assert_eq!(transport.health_requests().len(), 1);
  assert_eq!(transport.trigger_requests().len(), 3);
}

#[tokio::test]
async fn test_health_probe_runs_every_call_without_ttl() {
  let transport = Arc::new(FakeTransport::new());
  let client = client(&transport, config(3));

  for _ in 0..2 {
    client
      .trigger(&sample_event(), CancellationToken::new())
      .await
      .unwrap();
  }

  assert_eq!(transport.health_requests().len(), 2);
}

#[tokio::test]
async fn test_bearer_token_auth() {
  let transport = Arc::new(FakeTransport::new());
  let mut config = config(3);
  config.credentials = Credentials::Bearer("secret".to_string());
  let client = client(&transport, config);

  client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap();

  for request in transport.requests() {
    assert_eq!(request.header_value("authorization"), Some("Bearer secret"));
    assert_eq!(request.basic_auth, None);
  }
}

#[tokio::test]
async fn test_basic_auth() {
  let transport = Arc::new(FakeTransport::new());
  let mut config = config(3);
  config.credentials =
    Credentials::from_parts(None, Some("admin".to_string()), Some("pw".to_string()));
  let client = client(&transport, config);

  client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap();

  let request = &transport.trigger_requests()[0];
  assert_eq!(
    request.basic_auth,
    Some(("admin".to_string(), "pw".to_string()))
  );
  assert_eq!(request.header_value("authorization"), None);
}

#[tokio::test]
async fn test_supplied_correlation_id_is_threaded_through() {
  let transport = Arc::new(FakeTransport::new());
  let client = client(&transport, config(3));

  client
    .trigger_with_correlation_id(&sample_event(), "corr-123", CancellationToken::new())
    .await
    .unwrap();

  let request = &transport.trigger_requests()[0];
  assert_eq!(request.header_value(CORRELATION_ID_HEADER), Some("corr-123"));
  assert_eq!(request.body.as_ref().unwrap()["conf"]["correlation_id"], "corr-123");
}

#[tokio::test]
async fn test_run_id_is_stable_across_calls() {
  let transport = Arc::new(FakeTransport::new());
  let client = client(&transport, config(3));
  let event = sample_event();

  let first = client.trigger(&event, CancellationToken::new()).await.unwrap();
  let second = client.trigger(&event, CancellationToken::new()).await.unwrap();

  assert_eq!(first, second);

  let requests = transport.trigger_requests();
  assert_ne!(
    requests[0].header_value(CORRELATION_ID_HEADER),
    requests[1].header_value(CORRELATION_ID_HEADER)
  );
}

#[tokio::test]
async fn test_dead_letter_entry_links_to_trigger_call() {
  let transport = Arc::new(FakeTransport::new());
  transport.push_trigger(401, "nope");
  let (client, store, _dir) = client_with_store(&transport, config(3));

  client
    .trigger_with_correlation_id(&sample_event(), "corr-123", CancellationToken::new())
    .await
    .unwrap_err();

  let raw = std::fs::read_to_string(store.path()).unwrap();
  assert!(raw.contains("corr-123"));

  let entries = dead_letters(&store).await;
  assert_eq!(entries[0].correlation_id.as_deref(), Some("corr-123"));
  let conf = entries[0].conf.as_ref().expect("resolved conf should be stored");
  assert_eq!(conf["foo"], "baz");
  assert_eq!(conf["correlation_id"], "corr-123");

  let sent = transport.trigger_requests()[0].body.clone().unwrap();
  assert_eq!(json!(conf), sent["conf"]);
}

#[tokio::test]
async fn test_unmapped_dead_letter_has_correlation_id_only() {
  let transport = Arc::new(FakeTransport::new());
  let (client, store, _dir) = client_with_store(&transport, config(3));

  client
    .trigger_with_correlation_id(
      &event(json!({"type": "unknown_event"})),
      "corr-456",
      CancellationToken::new(),
    )
    .await
    .unwrap_err();

  let entries = dead_letters(&store).await;
  assert_eq!(entries[0].correlation_id.as_deref(), Some("corr-456"));
  assert_eq!(entries[0].conf, None);
}

#[tokio::test]
async fn test_dead_letter_failure_does_not_mask_error() {
  let transport = Arc::new(FakeTransport::new());
  transport.push_trigger(403, "forbidden");
  let client = client(&transport, config(3)).with_dead_letter(Arc::new(FailingStore));

  let err = client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, TriggerError::Unauthorized { status: 403, .. }));
}

#[tokio::test]
async fn test_dead_letter_path_from_config() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("nested").join("dlq.jsonl");
  let transport = Arc::new(FakeTransport::new());
  transport.push_trigger(401, "nope");
  let mut config = config(3);
  config.dead_letter_path = Some(path.clone());
  let client = client(&transport, config);

  client
    .trigger(&sample_event(), CancellationToken::new())
    .await
    .unwrap_err();

  let contents = std::fs::read_to_string(&path).unwrap();
  assert_eq!(contents.lines().count(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start() {
  let transport = Arc::new(FakeTransport::new());
  let (client, store, _dir) = client_with_store(&transport, config(3));
  let cancel = CancellationToken::new();
  cancel.cancel();

  let err = client.trigger(&sample_event(), cancel).await.unwrap_err();

  assert!(matches!(err, TriggerError::Cancelled));
  assert!(transport.requests().is_empty());
  assert_eq!(client.metrics().outcome_count(Outcome::Error), 1);
  assert_eq!(dead_letters(&store).await.len(), 1);
}

#[tokio::test]
async fn test_cancel_interrupts_request() {
  let transport = Arc::new(FakeTransport::hanging());
  let client = client(&transport, config(3));
  let cancel = CancellationToken::new();

  let canceller = {
    let cancel = cancel.clone();
    async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      cancel.cancel();
    }
  };

  let event = sample_event();
  let (result, ()) = tokio::join!(client.trigger(&event, cancel), canceller);

  assert!(matches!(result, Err(TriggerError::Cancelled)));
  assert_eq!(transport.trigger_requests().len(), 1);
}

#[tokio::test]
async fn test_cancel_interrupts_backoff() {
  let transport = Arc::new(FakeTransport::new());
  transport.push_trigger(503, "busy");
  let mut config = config(3);
  config.backoff_factor = Duration::from_secs(3600);
  let client = client(&transport, config);
  let cancel = CancellationToken::new();

  let canceller = {
    let cancel = cancel.clone();
    async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      cancel.cancel();
    }
  };

  let event = sample_event();
  let (result, ()) = tokio::join!(client.trigger(&event, cancel), canceller);

  assert!(matches!(result, Err(TriggerError::Cancelled)));
  assert_eq!(transport.trigger_requests().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_triggers_share_metrics() {
  let transport = Arc::new(FakeTransport::new());
  let client = Arc::new(client(&transport, config(3)));

  let handles: Vec<_> = (0..16)
    .map(|n| {
      let client = client.clone();
      tokio::spawn(async move {
        let event = event(json!({"type": "sample_event", "bar": n}));
        client.trigger(&event, CancellationToken::new()).await
      })
    })
    .collect();

  for handle in handles {
    handle.await.unwrap().unwrap();
  }

  let metrics = client.metrics();
  assert_eq!(metrics.triggers_total(), 16);
  assert_eq!(metrics.outcome_count(Outcome::Success), 16);
  assert_eq!(metrics.latency_samples(), 16);
  assert_eq!(transport.trigger_requests().len(), 16);
}
