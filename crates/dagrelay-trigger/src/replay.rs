//! Dead-letter replay.

use std::sync::Arc;

use dagrelay_dead_letter::{DeadLetterError, DeadLetterStore, StoredLine};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::TriggerClient;
use crate::error::TriggerError;

/// Summary of one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
  /// Entries triggered successfully and dropped from the store.
  pub replayed: usize,
  /// Entries still failing (or not attempted) and kept in the store.
  pub remaining: usize,
  /// Unparseable lines kept verbatim.
  pub malformed: usize,
}

/// Re-triggers dead-lettered events through a [`TriggerClient`].
///
/// The store is loaded once, every entry is retried in order, and the
/// store is rewritten once with whatever did not succeed. No other writer
/// may append to the store while a pass runs.
pub struct Replayer {
  client: TriggerClient,
  store: Arc<dyn DeadLetterStore>,
}

impl Replayer {
  /// The client's own dead-lettering is disabled so failures are not
  /// re-queued into the store being replayed.
  pub fn new(client: TriggerClient, store: Arc<dyn DeadLetterStore>) -> Self {
    Self {
      client: client.without_dead_letter(),
      store,
    }
  }

  pub fn client(&self) -> &TriggerClient {
    &self.client
  }

  /// Run one pass. Per-entry failures are recorded in the store, never
  /// returned; only store I/O errors fail the pass.
  ///
  /// On cancellation, entries not yet attempted and the entry in flight are
  /// kept unchanged.
  pub async fn run(&self, cancel: CancellationToken) -> Result<ReplayReport, DeadLetterError> {
    let lines = self.store.load().await?;
    let mut report = ReplayReport::default();
    let mut keep = Vec::with_capacity(lines.len());

    for line in lines {
      let mut entry = match line {
        StoredLine::Entry(entry) => entry,
        malformed @ StoredLine::Malformed(_) => {
          report.malformed += 1;
          keep.push(malformed);
          continue;
        }
      };

      if cancel.is_cancelled() {
        report.remaining += 1;
        keep.push(StoredLine::Entry(entry));
        continue;
      }

      let correlation_id = uuid::Uuid::new_v4().to_string();
      let result = self
        .client
        .trigger_with_correlation_id(&entry.event, &correlation_id, cancel.clone())
        .await;

      match result {
        Ok(run_id) => {
          report.replayed += 1;
          info!(run_id = %run_id, "dead letter replayed");
        }
        // cancelled mid-call, keep the stored error
        Err(TriggerError::Cancelled) => {
          report.remaining += 1;
          keep.push(StoredLine::Entry(entry));
        }
        Err(e) => {
          warn!(
            workflow_id = entry.workflow_id.as_deref(),
            error = %e,
            "dead letter replay failed"
          );
          entry.error = e.to_string();
          entry.correlation_id = Some(correlation_id);
          report.remaining += 1;
          keep.push(StoredLine::Entry(entry));
        }
      }
    }

    self.store.replace(&keep).await?;

    info!(
      replayed = report.replayed,
      remaining = report.remaining,
      malformed = report.malformed,
      "replay completed"
    );

    Ok(report)
  }
}
