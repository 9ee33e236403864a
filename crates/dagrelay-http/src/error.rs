use thiserror::Error;

/// Errors raised before a response was received.
#[derive(Debug, Error)]
pub enum TransportError {
  /// No response within the request timeout.
  #[error("request to {url} timed out after {timeout_ms}ms")]
  Timeout { url: String, timeout_ms: u64 },

  /// Connection, TLS or protocol failure.
  #[error("request to {url} failed: {message}")]
  Request { url: String, message: String },

  /// The request could not be built (bad URL, unencodable body).
  #[error("invalid request to {url}: {message}")]
  InvalidRequest { url: String, message: String },
}
