//! Configuration for Fete binaries.
//!
//! [`schema`] holds the typed configuration, [`loader`] reads it from disk and
//! the environment, and [`build_backend`] turns the backend section into a
//! ready-to-use [`GenerationBackend`](fete_adapters::GenerationBackend).

#![warn(missing_docs, clippy::pedantic)]

mod backend;
pub mod loader;
pub mod schema;

pub use backend::build_backend;
pub use fete_telemetry::TelemetryConfig;
pub use loader::{
    CONFIG_CANDIDATES, apply_env_overrides, find_config_file, load_config, load_config_from_file,
};
pub use schema::{BackendConfig, PlannerConfig, Provider};
