//! Dagrelay Trigger
//!
//! The trigger engine turns a whitelisted [`Event`](dagrelay_config::Event)
//! into a workflow run on the orchestrator:
//!
//! ```text
//! event -> mapping lookup -> conf resolution -> run id -> health gate
//!       -> POST dagRuns (retry/backoff) -> run id | dead letter
//! ```
//!
//! [`TriggerClient`] drives that flow. [`HealthGate`] is the pre-flight
//! circuit breaker, [`RetryPolicy`] decides between retrying and giving up,
//! [`TriggerMetrics`] holds the Prometheus handles, and [`Replayer`] feeds
//! dead-lettered events back through a client.

mod client;
mod error;
mod health;
mod metrics;
mod replay;
mod retry;

pub use client::{CORRELATION_ID_HEADER, TriggerClient};
pub use error::{Outcome, TriggerError};
pub use health::{HEALTHY_STATUS, HealthGate, is_healthy_report};
pub use metrics::TriggerMetrics;
pub use replay::{ReplayReport, Replayer};
pub use retry::{AttemptFailure, Decision, RetryPolicy, classify};
