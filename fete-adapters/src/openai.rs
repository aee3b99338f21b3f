//! `OpenAI` chat-completions backend.

use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use hyper::Uri;
use hyper::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::transport::{DEFAULT_TIMEOUT, Transport, parse_endpoint, sanitize_base_url};
use crate::traits::{
    BackendError, BackendMetadata, BackendResult, GenerationBackend, GenerationRequest,
    OutputFormat,
};

/// Environment variable used when loading configuration automatically.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration for the `OpenAI` backend.
#[derive(Clone)]
pub struct OpenAiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key_set", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Creates a configuration using the supplied model identifier.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: "https://api.openai.com/".to_owned(),
            timeout: DEFAULT_TIMEOUT,
            default_temperature: None,
        }
    }

    /// Loads the API key from the `OPENAI_API_KEY` environment variable.
    #[must_use]
    pub fn from_env(model: impl Into<String>) -> Self {
        let mut cfg = Self::new(model);
        cfg.api_key = env::var(OPENAI_API_KEY_ENV).ok();
        cfg
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> BackendResult<Self> {
        self.base_url = sanitize_base_url("OpenAI", base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the default sampling temperature used when requests omit it.
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// `OpenAI` backend that calls the chat completions API over HTTPS.
pub struct OpenAiBackend {
    transport: Transport,
    endpoint: Uri,
    metadata: BackendMetadata,
    authorization: String,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiBackend {
    /// Constructs a new backend with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] if the API key is missing.
    pub fn new(config: OpenAiConfig) -> BackendResult<Self> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BackendError::configuration("OpenAI backend requires an API key"))?;

        let endpoint = parse_endpoint(
            "OpenAI",
            &format!("{}v1/chat/completions", config.base_url),
        )?;

        Ok(Self {
            transport: Transport::new("OpenAI", config.timeout),
            endpoint,
            metadata: BackendMetadata::new("openai", config.model),
            authorization: format!("Bearer {api_key}"),
            default_temperature: config.default_temperature,
        })
    }

    fn build_request<'a>(&'a self, request: &'a GenerationRequest) -> ChatCompletionRequest<'a> {
        let response_format = match request.output_format() {
            OutputFormat::Json => Some(ResponseFormat {
                kind: "json_object",
            }),
            OutputFormat::Text => None,
        };

        ChatCompletionRequest {
            model: self.metadata.model(),
            messages: vec![ChatMessage {
                role: "user",
                content: request.prompt(),
            }],
            temperature: request.temperature().or(self.default_temperature),
            max_tokens: request.max_output_tokens(),
            response_format,
            stream: false,
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn metadata(&self) -> &BackendMetadata {
        &self.metadata
    }

    async fn generate(&self, request: GenerationRequest) -> BackendResult<String> {
        let payload = self.build_request(&request);
        let bytes = self
            .transport
            .post_json(
                self.endpoint.clone(),
                &[(AUTHORIZATION, self.authorization.as_str())],
                &payload,
            )
            .await?;

        let response: ChatCompletionResponse = self.transport.decode(&bytes)?;
        extract_content(response)
    }
}

fn extract_content(response: ChatCompletionResponse) -> BackendResult<String> {
    response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.and_then(|message| message.content))
        .ok_or_else(|| BackendError::response("OpenAI returned no message content"))
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> OpenAiBackend {
        OpenAiBackend::new(
            OpenAiConfig::new("gpt-4o-mini")
                .with_default_temperature(0.2)
                .with_api_key("test_key"),
        )
        .expect("backend")
    }

    #[test]
    fn base_url_requires_scheme() {
        let err = OpenAiConfig::new("gpt-4o-mini")
            .with_base_url("api.openai.com")
            .expect_err("missing scheme should error");
        assert!(matches!(err, BackendError::Configuration { .. }));
    }

    #[test]
    fn requires_api_key() {
        let err = OpenAiBackend::new(OpenAiConfig::new("gpt-4o-mini").with_api_key(" "))
            .expect_err("blank key");
        assert!(matches!(err, BackendError::Configuration { .. }));
    }

    #[test]
    fn build_request_uses_defaults_and_json_mode() {
        let backend = backend();
        let request = GenerationRequest::new("hello")
            .unwrap()
            .with_output_format(OutputFormat::Json);

        let payload = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"], "hello");
        assert_eq!(payload["response_format"]["type"], "json_object");
        assert!(payload["temperature"].is_number());
        assert!(payload.get("max_tokens").is_none());
    }

    #[test]
    fn response_parsing_extracts_content() {
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "hi"}}]}"#).unwrap();
        assert_eq!(extract_content(parsed).unwrap(), "hi");
    }

    #[test]
    fn missing_content_is_an_error() {
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {}}]}"#).unwrap();
        assert!(matches!(
            extract_content(parsed),
            Err(BackendError::Response { .. })
        ));
    }

    #[test]
    fn debug_hides_api_key() {
        assert!(!format!("{:?}", backend()).contains("test_key"));
    }
}
