use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dagrelay_config::{Credentials, Event, MappingTable, TriggerConfig};
use dagrelay_dead_letter::JsonlStore;
use dagrelay_http::ReqwestTransport;
use dagrelay_trigger::{Replayer, TriggerClient, TriggerMetrics};

/// Dagrelay - trigger orchestrator workflow runs from platform events
#[derive(Parser)]
#[command(name = "dagrelay")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Log filter directive, e.g. `debug` or `dagrelay_trigger=debug` (default: RUST_LOG, then info)
  #[arg(long, global = true)]
  log_level: Option<String>,

  /// Print Prometheus metrics to stderr when the command finishes
  #[arg(long, global = true)]
  print_metrics: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Trigger the workflow mapped to one event read from stdin
  Trigger {
    #[command(flatten)]
    orchestrator: OrchestratorArgs,

    /// Append failed triggers to this dead-letter file
    #[arg(long, env = "DAGRELAY_DLQ")]
    dlq: Option<PathBuf>,
  },

  /// Re-trigger every event in a dead-letter file
  Replay {
    #[command(flatten)]
    orchestrator: OrchestratorArgs,

    /// Dead-letter file to replay and rewrite
    #[arg(long, env = "DAGRELAY_DLQ")]
    dlq: PathBuf,
  },
}

#[derive(Args)]
struct OrchestratorArgs {
  /// Orchestrator base URL
  #[arg(long, env = "AIRFLOW_URL", default_value = "http://localhost:8080")]
  airflow_url: String,

  /// Bearer token (takes precedence over basic auth)
  #[arg(long, env = "AIRFLOW_TOKEN", hide_env_values = true)]
  token: Option<String>,

  /// Basic auth username
  #[arg(long, env = "AIRFLOW_USERNAME")]
  username: Option<String>,

  /// Basic auth password
  #[arg(long, env = "AIRFLOW_PASSWORD", hide_env_values = true)]
  password: Option<String>,

  /// Path to the event mapping file (JSON or YAML)
  #[arg(long, env = "DAGRELAY_MAPPINGS")]
  mappings: PathBuf,

  /// Maximum trigger attempts per event
  #[arg(long, default_value_t = 3)]
  max_retries: u32,

  /// Base backoff between attempts, in milliseconds
  #[arg(long, default_value_t = 500)]
  backoff_ms: u64,

  /// Per-attempt request timeout, in seconds
  #[arg(long, default_value_t = 10)]
  request_timeout_secs: u64,

  /// Health probe timeout, in seconds
  #[arg(long, default_value_t = 5)]
  health_timeout_secs: u64,

  /// Reuse a health probe result for this long, in milliseconds (0 probes every trigger)
  #[arg(long, default_value_t = 0)]
  health_cache_ms: u64,
}

impl OrchestratorArgs {
  fn into_config(self, dead_letter_path: Option<PathBuf>) -> (TriggerConfig, PathBuf) {
    let config = TriggerConfig {
      base_url: self.airflow_url,
      credentials: Credentials::from_parts(self.token, self.username, self.password),
      max_retries: self.max_retries,
      backoff_factor: Duration::from_millis(self.backoff_ms),
      request_timeout: Duration::from_secs(self.request_timeout_secs),
      health_timeout: Duration::from_secs(self.health_timeout_secs),
      health_cache_ttl: Duration::from_millis(self.health_cache_ms),
      dead_letter_path,
    };
    (config, self.mappings)
  }
}

fn main() -> Result<()> {
  let Cli {
    log_level,
    print_metrics,
    command,
  } = Cli::parse();

  init_tracing(log_level.as_deref())?;

  let metrics = TriggerMetrics::new().context("failed to register metrics")?;

  let rt = tokio::runtime::Runtime::new()?;
  let result = rt.block_on(async {
    let cancel = shutdown_token();

    match command {
      Commands::Trigger { orchestrator, dlq } => {
        let client = build_client(orchestrator, dlq, &metrics)?;
        run_trigger(client, cancel).await
      }
      Commands::Replay { orchestrator, dlq } => {
        let client = build_client(orchestrator, None, &metrics)?;
        run_replay(client, dlq, cancel).await
      }
    }
  });

  if print_metrics {
    eprint!("{}", metrics.render().context("failed to render metrics")?);
  }

  result
}

fn init_tracing(log_level: Option<&str>) -> Result<()> {
  let filter = match log_level {
    Some(directive) => EnvFilter::try_new(directive)
      .with_context(|| format!("invalid log level: {}", directive))?,
    None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();

  Ok(())
}

/// Cancelled on Ctrl-C so an in-flight trigger or replay stops cleanly.
fn shutdown_token() -> CancellationToken {
  let cancel = CancellationToken::new();
  let on_signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received, cancelling");
      on_signal.cancel();
    }
  });
  cancel
}

fn build_client(
  orchestrator: OrchestratorArgs,
  dlq: Option<PathBuf>,
  metrics: &TriggerMetrics,
) -> Result<TriggerClient> {
  let (config, mappings_path) = orchestrator.into_config(dlq);

  let mappings = MappingTable::load(&mappings_path)
    .with_context(|| format!("failed to load mappings: {}", mappings_path.display()))?;
  if mappings.is_empty() {
    warn!(path = %mappings_path.display(), "mapping table is empty, every event will be ignored");
  }

  info!(
    base_url = %config.base_url(),
    mappings = mappings.len(),
    "client configured"
  );

  Ok(TriggerClient::new(
    config,
    mappings,
    Arc::new(ReqwestTransport::new()),
    metrics.clone(),
  ))
}

async fn run_trigger(client: TriggerClient, cancel: CancellationToken) -> Result<()> {
  let event = read_event_from_stdin()?;

  let run_id = client
    .trigger(&event, cancel)
    .await
    .context("trigger failed")?;

  println!("{}", run_id);
  Ok(())
}

async fn run_replay(client: TriggerClient, dlq: PathBuf, cancel: CancellationToken) -> Result<()> {
  let store = Arc::new(JsonlStore::new(&dlq));

  let report = Replayer::new(client, store)
    .run(cancel)
    .await
    .with_context(|| format!("failed to replay dead letters: {}", dlq.display()))?;

  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}

fn read_event_from_stdin() -> Result<Event> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    bail!("expected an event JSON object on stdin");
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read event from stdin")?;

  if input.trim().is_empty() {
    bail!("expected an event JSON object on stdin, got nothing");
  }

  let value: serde_json::Value =
    serde_json::from_str(&input).context("failed to parse event JSON from stdin")?;
  Event::try_from(value).context("event must be a JSON object")
}
