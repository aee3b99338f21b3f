//! Shared generation backend trait and data structures.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by generation backends.
pub type BackendResult<T> = Result<T, BackendError>;

/// Error type shared by backend implementations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend is misconfigured or missing credentials.
    #[error("backend not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// The supplied request was invalid for the target model.
    #[error("invalid generation request: {reason}")]
    InvalidRequest {
        /// Reason describing why the request could not be processed.
        reason: String,
    },

    /// Transport-level failures (network, timeout, TLS).
    #[error("backend transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The provider rejected the request due to rate limiting.
    #[error("backend rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Suggested delay before retrying, when the provider sent one.
        retry_after: Option<Duration>,
    },

    /// The provider returned an error status or an undecodable envelope.
    #[error("backend response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },

    /// The model's text could not be read as a structured result.
    #[error("backend produced malformed output: {reason}")]
    Malformed {
        /// What was wrong with the text.
        reason: String,
    },
}

impl BackendError {
    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for provider response failures.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for unreadable model output.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Minimal metadata describing a backend instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendMetadata {
    provider: &'static str,
    model: String,
}

impl BackendMetadata {
    /// Creates metadata for the supplied provider and model identifier.
    #[must_use]
    pub fn new(provider: &'static str, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Returns the provider identifier (e.g., "gemini").
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for BackendMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Shape of the text the model is asked to produce.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Free-form text.
    #[default]
    Text,
    /// A single JSON object.
    Json,
}

/// Request submitted to a generation backend.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    #[serde(default)]
    output_format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl GenerationRequest {
    /// Creates a request for the supplied prompt.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidRequest`] if the prompt is blank.
    pub fn new(prompt: impl Into<String>) -> BackendResult<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(BackendError::invalid_request(
                "generation request requires a non-empty prompt",
            ));
        }

        Ok(Self {
            prompt,
            output_format: OutputFormat::Text,
            max_output_tokens: None,
            temperature: None,
        })
    }

    /// Sets the expected output format.
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Sets the maximum output token budget.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Returns the prompt text.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the expected output format.
    #[must_use]
    pub const fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Returns the configured maximum output tokens.
    #[must_use]
    pub const fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    /// Returns the configured sampling temperature.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }
}

/// Trait implemented by all generation backends.
///
/// A backend is an opaque `prompt -> text` function. Implementations make
/// exactly one provider call per [`generate`](GenerationBackend::generate)
/// and never retry on their own.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns basic metadata describing the backend instance.
    fn metadata(&self) -> &BackendMetadata;

    /// Sends the prompt to the model and returns its raw text.
    async fn generate(&self, request: GenerationRequest) -> BackendResult<String>;
}
