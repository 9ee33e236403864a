//! Dagrelay Dead Letter
//!
//! Failed triggers are persisted here so they can be replayed later. The
//! [`DeadLetterStore`] trait defines the operations the trigger engine and
//! the replayer need:
//! - appending one entry per failed trigger
//! - loading every stored line
//! - atomically replacing the store's contents after a replay pass
//!
//! [`JsonlStore`] keeps entries as newline-delimited JSON in a single file.

mod entry;
mod jsonl;

pub use entry::{DeadLetterEntry, StoredLine};
pub use jsonl::JsonlStore;

use async_trait::async_trait;

/// Error type for dead-letter operations.
#[derive(Debug, thiserror::Error)]
pub enum DeadLetterError {
  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// An entry could not be serialized.
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Durable store for dead-letter entries.
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
  /// Append one entry as a single atomic record.
  ///
  /// Concurrent appends never interleave partial records.
  async fn append(&self, entry: &DeadLetterEntry) -> Result<(), DeadLetterError>;

  /// Load every stored line in order. A missing store is empty.
  async fn load(&self) -> Result<Vec<StoredLine>, DeadLetterError>;

  /// Replace the store's contents with `lines`.
  async fn replace(&self, lines: &[StoredLine]) -> Result<(), DeadLetterError>;
}
