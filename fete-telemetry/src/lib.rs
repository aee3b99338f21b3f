//! Structured logging setup.
//!
//! Libraries in this workspace only emit `tracing` events; binaries call
//! [`init_tracing`] once at startup to print them.

#![warn(missing_docs, clippy::pedantic)]

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Default filter directive when neither the config nor `RUST_LOG` sets one.
pub const DEFAULT_FILTER: &str = "info";

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Logging options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelemetryConfig {
    /// `EnvFilter` directives, e.g. `info,fete_kernel=debug`.
    pub filter: String,
    /// Colored output.
    pub ansi: bool,
    /// Print event targets (module paths).
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_owned(),
            ansi: true,
            with_target: false,
        }
    }
}

/// Installs the global `fmt` subscriber, writing to stderr.
///
/// `RUST_LOG`, when set, takes precedence over `config.filter`. Returns
/// `Ok(false)` if a subscriber was already installed by an earlier call.
///
/// # Errors
///
/// Returns an error when the filter directives cannot be parsed or another
/// global subscriber is already in place.
pub fn init_tracing(config: &TelemetryConfig) -> Result<bool> {
    let filter = build_filter(env::var("RUST_LOG").ok().as_deref(), &config.filter)?;
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(false);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
    Ok(true)
}

fn build_filter(from_env: Option<&str>, configured: &str) -> Result<EnvFilter> {
    match from_env.filter(|value| !value.trim().is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid RUST_LOG directives `{directives}`")),
        None => EnvFilter::try_new(configured)
            .with_context(|| format!("invalid log filter `{configured}`")),
    }
}
