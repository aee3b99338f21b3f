//! `Ollama` backend for locally hosted models.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use hyper::Uri;
use serde::{Deserialize, Serialize};

use crate::transport::{DEFAULT_TIMEOUT, Transport, parse_endpoint, sanitize_base_url};
use crate::traits::{
    BackendError, BackendMetadata, BackendResult, GenerationBackend, GenerationRequest,
    OutputFormat,
};

/// Configuration for the `Ollama` backend.
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    base_url: String,
    model: String,
    default_temperature: Option<f32>,
    timeout: Duration,
}

impl OllamaConfig {
    /// Creates a configuration for the supplied model pointing at the local daemon.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: "http://127.0.0.1:11434/".to_owned(),
            model: model.into(),
            default_temperature: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the base URL of the Ollama daemon.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> BackendResult<Self> {
        self.base_url = sanitize_base_url("Ollama", base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the default sampling temperature used when the request does not
    /// provide one explicitly.
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    /// Sets the HTTP timeout for requests to the Ollama daemon.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `Ollama` backend that calls `/api/chat` on the daemon.
pub struct OllamaBackend {
    transport: Transport,
    endpoint: Uri,
    metadata: BackendMetadata,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OllamaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaBackend")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OllamaBackend {
    /// Constructs a new backend from the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] if the endpoint is invalid.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(config: OllamaConfig) -> BackendResult<Self> {
        let endpoint = parse_endpoint("Ollama", &format!("{}api/chat", config.base_url))?;

        Ok(Self {
            transport: Transport::new("Ollama", config.timeout),
            endpoint,
            metadata: BackendMetadata::new("ollama", config.model.clone()),
            default_temperature: config.default_temperature,
        })
    }

    fn build_request<'a>(&'a self, request: &'a GenerationRequest) -> ChatRequest<'a> {
        let temperature = request.temperature().or(self.default_temperature);
        let options = if temperature.is_some() || request.max_output_tokens().is_some() {
            Some(ChatOptions {
                temperature,
                num_predict: request.max_output_tokens(),
            })
        } else {
            None
        };

        ChatRequest {
            model: self.metadata.model(),
            stream: false,
            messages: vec![ChatMessage {
                role: "user".to_owned(),
                content: request.prompt().to_owned(),
            }],
            format: match request.output_format() {
                OutputFormat::Json => Some("json"),
                OutputFormat::Text => None,
            },
            options,
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn metadata(&self) -> &BackendMetadata {
        &self.metadata
    }

    async fn generate(&self, request: GenerationRequest) -> BackendResult<String> {
        let payload = self.build_request(&request);
        let bytes = self
            .transport
            .post_json(self.endpoint.clone(), &[], &payload)
            .await?;

        let response: ChatResponse = self.transport.decode(&bytes)?;
        extract_content(response)
    }
}

fn extract_content(response: ChatResponse) -> BackendResult<String> {
    if let Some(error) = response.error {
        return Err(BackendError::response(error));
    }

    response
        .message
        .map(|message| message.content)
        .or(response.response)
        .ok_or_else(|| BackendError::response("Ollama returned no message"))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = OllamaConfig::new("llama3.2")
            .with_base_url("localhost:11434")
            .expect_err("missing scheme should error");
        assert!(matches!(err, BackendError::Configuration { .. }));
    }

    #[test]
    fn endpoint_targets_chat_api() {
        let backend = OllamaBackend::new(
            OllamaConfig::new("llama3.2")
                .with_base_url("http://gpu-box:11434")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(backend.endpoint.to_string(), "http://gpu-box:11434/api/chat");
    }

    #[test]
    fn build_request_sets_json_format() {
        let backend = OllamaBackend::new(OllamaConfig::new("llama3.2")).unwrap();
        let request = GenerationRequest::new("hello")
            .unwrap()
            .with_output_format(OutputFormat::Json)
            .with_max_output_tokens(64);

        let payload = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(payload["format"], "json");
        assert_eq!(payload["stream"], false);
        assert_eq!(payload["options"]["num_predict"], 64);
        assert!(payload["options"].get("temperature").is_none());
    }

    #[test]
    fn build_request_without_options() {
        let backend = OllamaBackend::new(OllamaConfig::new("llama3.2")).unwrap();
        let request = GenerationRequest::new("hello").unwrap();
        let chat = backend.build_request(&request);
        assert!(chat.options.is_none());
        assert!(chat.format.is_none());
    }

    #[test]
    fn chat_response_prefers_message() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"message": {"role": "assistant", "content": "hi"}, "response": "ignored"}"#,
        )
        .unwrap();
        assert_eq!(extract_content(parsed).unwrap(), "hi");
    }

    #[test]
    fn daemon_error_is_surfaced() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"error": "model not found"}"#).unwrap();
        let err = extract_content(parsed).expect_err("error");
        assert!(err.to_string().contains("model not found"));
    }
}
