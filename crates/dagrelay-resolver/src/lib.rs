//! Dagrelay Resolver
//!
//! Pure functions that turn an [`Event`](dagrelay_config::Event) and its
//! [`MappingEntry`](dagrelay_config::MappingEntry) into the pieces of a
//! trigger request:
//!
//! - [`resolve_conf`] substitutes `"{{ field }}"` placeholders in the conf
//!   template with event values.
//! - [`derive_run_id`] produces the content-addressed run identifier the
//!   orchestrator uses to deduplicate trigger requests.

mod canonical;
mod conf;
mod run_id;

pub use canonical::canonical_json;
pub use conf::{placeholder_key, resolve_conf, resolve_value};
pub use run_id::{RUN_ID_DIGEST_LEN, derive_run_id};
