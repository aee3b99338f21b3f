use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fete_adapters::GenerationBackend;
use fete_adapters::gemini::{GeminiBackend, GeminiConfig};
use fete_adapters::ollama::{OllamaBackend, OllamaConfig};
use fete_adapters::openai::{OpenAiBackend, OpenAiConfig};
use tracing::info;

use crate::schema::{BackendConfig, Provider};

/// Builds the backend described by `config`.
///
/// API keys come from `config.api_key` when set, otherwise from the provider's
/// usual environment variable.
///
/// # Errors
///
/// Returns an error when the base URL is invalid or a hosted provider has no API key.
pub fn build_backend(config: &BackendConfig) -> Result<Arc<dyn GenerationBackend>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let model = config.model();

    let backend: Arc<dyn GenerationBackend> = match config.provider {
        Provider::Gemini => {
            let mut settings = GeminiConfig::from_env(model).with_timeout(timeout);
            if let Some(key) = &config.api_key {
                settings = settings.with_api_key(key);
            }
            if let Some(base_url) = &config.base_url {
                settings = settings.with_base_url(base_url)?;
            }
            if let Some(temperature) = config.temperature {
                settings = settings.with_default_temperature(temperature);
            }
            Arc::new(GeminiBackend::new(settings).context("failed to configure Gemini backend")?)
        }
        Provider::OpenAi => {
            let mut settings = OpenAiConfig::from_env(model).with_timeout(timeout);
            if let Some(key) = &config.api_key {
                settings = settings.with_api_key(key);
            }
            if let Some(base_url) = &config.base_url {
                settings = settings.with_base_url(base_url)?;
            }
            if let Some(temperature) = config.temperature {
                settings = settings.with_default_temperature(temperature);
            }
            Arc::new(OpenAiBackend::new(settings).context("failed to configure OpenAI backend")?)
        }
        Provider::Ollama => {
            let mut settings = OllamaConfig::new(model).with_timeout(timeout);
            if let Some(base_url) = &config.base_url {
                settings = settings.with_base_url(base_url)?;
            }
            if let Some(temperature) = config.temperature {
                settings = settings.with_default_temperature(temperature);
            }
            Arc::new(OllamaBackend::new(settings).context("failed to configure Ollama backend")?)
        }
    };

    info!(backend = %backend.metadata(), "generation backend ready");
    Ok(backend)
}
