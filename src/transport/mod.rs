//! Backend seam for the resilient client.
//!
//! [`CompletionBackend`] performs exactly one round-trip and reports what came
//! back; it never retries. All recovery policy lives in the client.

use async_trait::async_trait;

use crate::types::RequestPayload;

pub mod http;

pub use http::{HttpTransport, TransportError, DEFAULT_BASE_URL};

/// Raw outcome of one attempt that reached the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReply {
    pub status: u16,
    pub body: String,
    /// `Retry-After` hint in milliseconds, when the backend sent one.
    pub retry_after_ms: Option<u32>,
}

impl BackendReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after_ms: None,
        }
    }

    pub fn with_retry_after_ms(mut self, ms: u32) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send `payload` to `model` using `api_key`.
    ///
    /// `Err` means no HTTP status was obtained (connect failure, timeout, broken body).
    async fn generate(
        &self,
        model: &str,
        api_key: &str,
        payload: &RequestPayload,
    ) -> Result<BackendReply, TransportError>;
}
