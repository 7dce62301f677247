use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{BackendReply, CompletionBackend};
use crate::types::RequestPayload;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub(crate) fn env_base_url() -> String {
    env::var("GEO_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn env_timeout() -> Duration {
    parse_timeout_secs(env::var("GEO_HTTP_TIMEOUT_SECS").ok().as_deref())
}

/// Whole seconds; unset, unparsable or zero falls back to [`DEFAULT_TIMEOUT`].
fn parse_timeout_secs(raw: Option<&str>) -> Duration {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

/// reqwest-backed generateContent transport.
///
/// One POST per attempt to `{base_url}/v1beta/models/{model}:generateContent`,
/// with the key passed as the `key` query parameter.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// `GEO_PROXY_URL`, when set, routes every request through that proxy.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = url::Url::parse(base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(base_url.to_string())
                    .with_source("http_transport"),
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                "base URL must use http or https",
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(base_url.to_string())
                    .with_source("http_transport"),
            ));
        }

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("GEO_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn retry_after_ms(headers: &HeaderMap) -> Option<u32> {
        let raw = headers.get("retry-after")?.to_str().ok()?.trim();
        let secs: u32 = raw.parse().ok()?;
        Some(secs.saturating_mul(1000))
    }
}

#[async_trait]
impl CompletionBackend for HttpTransport {
    async fn generate(
        &self,
        model: &str,
        api_key: &str,
        payload: &RequestPayload,
    ) -> std::result::Result<BackendReply, TransportError> {
        let request_id = Uuid::new_v4().to_string();
        debug!(model, request_id = request_id.as_str(), "sending generateContent");

        let resp = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", api_key)])
            .header("x-request-id", request_id.as_str())
            .json(payload)
            .send()
            .await
            .map_err(redact)?;

        let status = resp.status().as_u16();
        let retry_after_ms = Self::retry_after_ms(resp.headers());
        let body = resp.text().await.map_err(redact)?;

        Ok(BackendReply {
            status,
            body,
            retry_after_ms,
        })
    }
}

// The request URL carries the API key as a query parameter.
fn redact(e: reqwest::Error) -> TransportError {
    TransportError::Http(e.without_url())
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_model() {
        let t = HttpTransport::new("http://localhost:4010/", Duration::from_secs(5)).unwrap();
        assert_eq!(t.base_url(), "http://localhost:4010");
        assert_eq!(
            t.endpoint("gemini-1.5-pro"),
            "http://localhost:4010/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = HttpTransport::new("ftp://example.com", Duration::from_secs(5))
            .err()
            .expect("ftp should be rejected");
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(HttpTransport::new("not a url", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn timeout_secs_fall_back_to_default() {
        assert_eq!(parse_timeout_secs(Some("15")), Duration::from_secs(15));
        assert_eq!(parse_timeout_secs(Some(" 90 ")), Duration::from_secs(90));
        assert_eq!(parse_timeout_secs(None), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout_secs(Some("")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout_secs(Some("1.5")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout_secs(Some("-3")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout_secs(Some("0")), DEFAULT_TIMEOUT);
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(60));
    }

    #[test]
    fn retry_after_is_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "3".parse().unwrap());
        assert_eq!(HttpTransport::retry_after_ms(&headers), Some(3000));
        headers.insert("retry-after", "Wed, 21 Oct 2026 07:28:00 GMT".parse().unwrap());
        assert_eq!(HttpTransport::retry_after_ms(&headers), None);
    }
}
