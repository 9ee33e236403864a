//! Retry policy for trigger attempts.
//!
//! Classification and backoff are pure so they can be tested without a
//! transport. The client owns the side effects (sending, sleeping, logging).

use std::fmt;
use std::time::Duration;

use dagrelay_http::{HttpResponse, TransportError};

/// Longest response body carried into error messages.
const MAX_BODY_CHARS: usize = 512;

/// Why a single attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
  /// HTTP 401 or 403.
  Unauthorized { status: u16, body: String },
  /// HTTP 5xx, a timeout, or a transport error.
  Transient { reason: String },
  /// Any other non-2xx response.
  Terminal { status: u16, body: String },
}

impl fmt::Display for AttemptFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AttemptFailure::Unauthorized { status, body } | AttemptFailure::Terminal { status, body } => {
        write!(f, "HTTP {}: {}", status, body)
      }
      AttemptFailure::Transient { reason } => f.write_str(reason),
    }
  }
}

/// Classify the result of one attempt. `Ok` means the response was 2xx.
pub fn classify(
  result: Result<HttpResponse, TransportError>,
) -> Result<HttpResponse, AttemptFailure> {
  let response = match result {
    Ok(response) => response,
    Err(e) => {
      return Err(AttemptFailure::Transient {
        reason: e.to_string(),
      });
    }
  };

  match response.status {
    200..=299 => Ok(response),
    401 | 403 => Err(AttemptFailure::Unauthorized {
      status: response.status,
      body: truncate(&response.body),
    }),
    500..=u16::MAX => Err(AttemptFailure::Transient {
      reason: format!("HTTP {}: {}", response.status, truncate(&response.body)),
    }),
    status => Err(AttemptFailure::Terminal {
      status,
      body: truncate(&response.body),
    }),
  }
}

fn truncate(body: &str) -> String {
  match body.char_indices().nth(MAX_BODY_CHARS) {
    Some((idx, _)) => format!("{}...", &body[..idx]),
    None => body.to_string(),
  }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  /// Sleep for the given delay, then try again.
  Retry(Duration),
  /// Stop and report the failure.
  GiveUp,
}

/// Bounded exponential backoff.
///
/// Attempts are numbered from 1. After a transient failure on attempt `n`
/// (and `n < max_attempts`) the client sleeps `backoff_factor * 2^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  max_attempts: u32,
  backoff_factor: Duration,
}

impl RetryPolicy {
  /// `max_attempts` is clamped to at least one.
  pub fn new(max_attempts: u32, backoff_factor: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      backoff_factor,
    }
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  /// Delay to wait after the given (failed) attempt.
  pub fn delay(&self, attempt: u32) -> Duration {
    let multiplier = 2u32
      .checked_pow(attempt.saturating_sub(1))
      .unwrap_or(u32::MAX);
    self.backoff_factor.saturating_mul(multiplier)
  }

  pub fn decide(&self, attempt: u32, failure: &AttemptFailure) -> Decision {
    match failure {
      AttemptFailure::Transient { .. } if attempt < self.max_attempts => {
        Decision::Retry(self.delay(attempt))
      }
      _ => Decision::GiveUp,
    }
  }
}
