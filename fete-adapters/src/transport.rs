//! HTTPS plumbing shared by the hosted backends.

use std::sync::Arc;
use std::time::Duration;

use hyper::body::{Bytes, to_bytes};
use hyper::client::HttpConnector;
use hyper::header::{CONTENT_TYPE, HeaderName, RETRY_AFTER};
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::timeout;
use tracing::debug;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{BackendError, BackendResult};

type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Default request timeout applied by every backend.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// JSON-over-HTTPS client bound to one provider.
#[derive(Clone)]
pub(crate) struct Transport {
    client: HyperClient,
    provider: &'static str,
    timeout: Duration,
}

impl Transport {
    pub(crate) fn new(provider: &'static str, timeout: Duration) -> Self {
        Self {
            client: build_https_client(),
            provider,
            timeout,
        }
    }

    /// POSTs `payload` as JSON and returns the body of a successful response.
    pub(crate) async fn post_json<T>(
        &self,
        uri: Uri,
        headers: &[(HeaderName, &str)],
        payload: &T,
    ) -> BackendResult<Bytes>
    where
        T: Serialize + ?Sized,
    {
        let provider = self.provider;
        let body = serde_json::to_vec(payload).map_err(|err| {
            BackendError::invalid_request(format!("failed to encode {provider} request: {err}"))
        })?;

        let mut builder = Request::post(uri).header(CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(name, *value);
        }
        let request = builder.body(Body::from(body)).map_err(|err| {
            BackendError::transport(format!("failed to build {provider} request: {err}"))
        })?;

        let response = timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| BackendError::transport(format!("{provider} request timed out")))?
            .map_err(|err| BackendError::transport(format!("{provider} request failed: {err}")))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);

        let bytes = to_bytes(response.into_body()).await.map_err(|err| {
            BackendError::transport(format!("failed to read {provider} response: {err}"))
        })?;

        debug!(provider, %status, bytes = bytes.len(), "backend responded");
        check_status(provider, status, retry_after, &bytes)?;
        Ok(bytes)
    }

    /// Decodes a provider envelope.
    pub(crate) fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> BackendResult<T> {
        serde_json::from_slice(bytes).map_err(|err| {
            BackendError::response(format!("failed to decode {} response: {err}", self.provider))
        })
    }
}

fn check_status(
    provider: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &[u8],
) -> BackendResult<()> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(BackendError::RateLimited { retry_after });
    }
    if !status.is_success() {
        let reason = String::from_utf8_lossy(body);
        return Err(BackendError::response(format!(
            "{provider} returned {status}: {reason}"
        )));
    }
    Ok(())
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn build_https_client() -> HyperClient {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    Client::builder().build::<_, Body>(HttpsConnector::from((http, Arc::new(config))))
}

/// Normalises a provider base URL to `scheme://host[/path]/`.
pub(crate) fn sanitize_base_url(provider: &str, input: &str) -> BackendResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(BackendError::configuration(format!(
            "{provider} base URL must start with http:// or https://"
        )));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>().map_err(|err| {
        BackendError::configuration(format!("invalid {provider} base URL: {err}"))
    })?;
    Ok(base)
}

pub(crate) fn parse_endpoint(provider: &str, endpoint: &str) -> BackendResult<Uri> {
    endpoint
        .parse::<Uri>()
        .map_err(|err| BackendError::configuration(format!("invalid {provider} endpoint: {err}")))
}
