//! Deterministic run identifiers.

use dagrelay_config::Event;
use sha2::{Digest, Sha256};

use crate::canonical::canonical_json;

/// Number of hex characters of the digest kept in a run identifier.
pub const RUN_ID_DIGEST_LEN: usize = 8;

/// Derive the run identifier for triggering `workflow_id` with `event`.
///
/// The result is `"{workflow_id}-{digest}"` where `digest` is the first
/// [`RUN_ID_DIGEST_LEN`] hex characters of the SHA-256 of the event's
/// canonical JSON. Structurally equal events always yield the same
/// identifier regardless of key order, which makes retries and replays
/// idempotent on the orchestrator side. The truncated digest is an
/// idempotency key, not a security boundary.
pub fn derive_run_id(workflow_id: &str, event: &Event) -> String {
  let payload = canonical_json(&event.to_value());
  let digest = hex::encode(Sha256::digest(payload.as_bytes()));
  format!("{}-{}", workflow_id, &digest[..RUN_ID_DIGEST_LEN])
}
