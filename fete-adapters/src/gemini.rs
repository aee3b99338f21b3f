//! Google Gemini backend, the default hosted model.

use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use hyper::Uri;
use hyper::header::HeaderName;
use serde::{Deserialize, Serialize};

use crate::transport::{DEFAULT_TIMEOUT, Transport, parse_endpoint, sanitize_base_url};
use crate::traits::{
    BackendError, BackendMetadata, BackendResult, GenerationBackend, GenerationRequest,
    OutputFormat,
};

/// Primary environment variable holding the API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Fallback environment variable holding the API key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Configuration for the Gemini backend.
#[derive(Clone)]
pub struct GeminiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key_set", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl GeminiConfig {
    /// Creates a configuration using the supplied model identifier.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            default_temperature: None,
        }
    }

    /// Loads the API key from `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`.
    #[must_use]
    pub fn from_env(model: impl Into<String>) -> Self {
        let mut cfg = Self::new(model);
        cfg.api_key = env::var(GEMINI_API_KEY_ENV)
            .or_else(|_| env::var(GOOGLE_API_KEY_ENV))
            .ok();
        cfg
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> BackendResult<Self> {
        self.base_url = sanitize_base_url("Gemini", base_url.as_ref())?;
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

/// Gemini backend calling `generateContent` over HTTPS.
pub struct GeminiBackend {
    transport: Transport,
    endpoint: Uri,
    metadata: BackendMetadata,
    api_key: String,
    default_temperature: Option<f32>,
}

impl fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GeminiBackend {
    /// Constructs a new backend with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] if the API key is missing or the
    /// endpoint cannot be formed from the model name.
    pub fn new(config: GeminiConfig) -> BackendResult<Self> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BackendError::configuration("Gemini backend requires an API key"))?;

        let endpoint = parse_endpoint(
            "Gemini",
            &format!(
                "{}v1beta/models/{}:generateContent",
                config.base_url, config.model
            ),
        )?;

        Ok(Self {
            transport: Transport::new("Gemini", config.timeout),
            endpoint,
            metadata: BackendMetadata::new("gemini", config.model),
            api_key,
            default_temperature: config.default_temperature,
        })
    }

    fn build_request<'a>(&self, request: &'a GenerationRequest) -> GenerateContentRequest<'a> {
        let response_mime_type = match request.output_format() {
            OutputFormat::Json => Some("application/json"),
            OutputFormat::Text => None,
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart {
                    text: request.prompt(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature().or(self.default_temperature),
                max_output_tokens: request.max_output_tokens(),
                response_mime_type,
            },
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn metadata(&self) -> &BackendMetadata {
        &self.metadata
    }

    async fn generate(&self, request: GenerationRequest) -> BackendResult<String> {
        let payload = self.build_request(&request);
        let bytes = self
            .transport
            .post_json(
                self.endpoint.clone(),
                &[(
                    HeaderName::from_static(API_KEY_HEADER),
                    self.api_key.as_str(),
                )],
                &payload,
            )
            .await?;

        let response: GenerateContentResponse = self.transport.decode(&bytes)?;
        extract_text(response)
    }
}

fn extract_text(response: GenerateContentResponse) -> BackendResult<String> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(BackendError::response(format!(
            "Gemini blocked the prompt: {reason}"
        )));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(BackendError::response("Gemini returned no candidates"));
    };

    Ok(candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> GeminiBackend {
        GeminiBackend::new(GeminiConfig::new("gemini-2.0-flash").with_api_key("test_key"))
            .expect("backend")
    }

    #[test]
    fn requires_api_key() {
        let err = GeminiBackend::new(GeminiConfig::new("gemini-2.0-flash")).expect_err("no key");
        assert!(matches!(err, BackendError::Configuration { .. }));
    }

    #[test]
    fn endpoint_includes_model() {
        let backend = backend();
        assert_eq!(
            backend.endpoint.to_string(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn json_mode_sets_mime_type() {
        let backend = backend();
        let request = GenerationRequest::new("ideas please")
            .unwrap()
            .with_output_format(OutputFormat::Json);

        let payload = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(payload["contents"][0]["role"], "user");
        assert_eq!(payload["contents"][0]["parts"][0]["text"], "ideas please");
    }

    #[test]
    fn text_mode_omits_optional_settings() {
        let backend = backend();
        let request = GenerationRequest::new("hello").unwrap();
        let payload = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(payload["generationConfig"], serde_json::json!({}));
    }

    #[test]
    fn extracts_candidate_text() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let err = extract_text(response).expect_err("blocked");
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn missing_candidates_is_an_error() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            extract_text(response),
            Err(BackendError::Response { .. })
        ));
    }

    #[test]
    fn debug_hides_api_key() {
        let config = GeminiConfig::new("gemini-2.0-flash").with_api_key("super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
        assert!(!format!("{:?}", backend()).contains("test_key"));
    }
}
