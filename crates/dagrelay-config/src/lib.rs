//! Dagrelay Config
//!
//! This crate contains the configuration types shared by the trigger engine:
//! the inbound [`Event`], the [`MappingTable`] that whitelists event types and
//! maps them to orchestrator workflows, and the [`TriggerConfig`] describing
//! how to reach the orchestrator.
//!
//! The mapping table can be loaded from:
//! - YAML files (`.yaml` / `.yml`)
//! - JSON files (any other extension)
//!
//! It is loaded once at startup and shared read-only afterwards.

mod credentials;
mod error;
mod event;
mod mapping;
mod settings;

pub use credentials::Credentials;
pub use error::ConfigError;
pub use event::Event;
pub use mapping::{MappingEntry, MappingTable};
pub use settings::TriggerConfig;
