//! Strongly typed configuration schemas.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use fete_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};

/// Seconds a single generation call may take before it is abandoned.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Top-level configuration document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerConfig {
    /// Which generation backend to call.
    pub backend: BackendConfig,
    /// Logging options.
    pub telemetry: TelemetryConfig,
}

impl PlannerConfig {
    /// Checks values serde cannot express as types.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero timeout or a blank model name.
    pub fn validate(&self) -> Result<()> {
        if self.backend.timeout_secs == 0 {
            bail!("backend.timeoutSecs must be greater than zero");
        }
        if let Some(model) = &self.backend.model {
            if model.trim().is_empty() {
                bail!("backend.model must not be blank");
            }
        }
        Ok(())
    }
}

/// Supported generation providers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini.
    #[default]
    Gemini,
    /// `OpenAI` chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// Local Ollama daemon.
    Ollama,
}

impl Provider {
    /// Model used when the configuration names none.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::OpenAi => "gpt-4o-mini",
            Self::Ollama => "llama3.2",
        }
    }

    /// Lowercase identifier, as written in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "googleai" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => bail!("unknown provider `{other}` (expected gemini, openai or ollama)"),
        }
    }
}

/// Generation backend settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackendConfig {
    /// Provider to call.
    pub provider: Provider,
    /// Model name; the provider's default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Base URL override, e.g. a proxy or a remote Ollama host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// API key; the provider's environment variable is used when absent.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl BackendConfig {
    /// Effective model name.
    #[must_use]
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            base_url: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: None,
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("provider", &self.provider)
            .field("model", &self.model())
            .field("base_url", &self.base_url)
            .field("api_key_set", &self.api_key.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}
