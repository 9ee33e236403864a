use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read mapping file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid YAML mapping file {path}: {source}")]
  Yaml {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid JSON mapping file {path}: {source}")]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("event must be a JSON object")]
  EventNotObject,
}
