//! Structured generation flows for party planning.
//!
//! Depend on this crate rather than the individual `fete-*` crates. Components
//! sit behind feature flags, all enabled by default.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use fete::config::{build_backend, load_config};
//! use fete::flows::{DecorationRequest, PartyPlanner};
//!
//! let config = load_config(None)?;
//! let planner = PartyPlanner::new(build_backend(&config.backend)?)?;
//! let ideas = planner
//!     .generate_decoration_ideas(&DecorationRequest::new(
//!         "A magical forest theme",
//!         "Emerald green, gold, cream",
//!         "A spacious backyard with a large oak tree",
//!     ))
//!     .await?;
//! println!("{}", ideas.decoration_ideas);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, clippy::pedantic)]

/// Shared primitives.
pub use fete_primitives as primitives;

/// Schemas and prompt templates (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use fete_prompts as prompts;

/// Generation backends (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use fete_adapters as adapters;

/// Flow orchestration (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use fete_kernel as kernel;

/// Decoration and vendor flows (enabled by `flows` feature).
#[cfg(feature = "flows")]
pub use fete_flows as flows;

/// Configuration loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use fete_config as config;

/// Logging setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use fete_telemetry as telemetry;
