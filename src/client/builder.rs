use std::sync::Arc;
use std::time::Duration;

use crate::client::core::ResilientClient;
use crate::client::policy::RecoveryPolicy;
use crate::transport::{CompletionBackend, HttpTransport};
use crate::Result;

/// Builder for [`ResilientClient`].
///
/// Keep this surface area small: the policy is fixed unless a test swaps it,
/// and the HTTP transport is configured from the environment.
pub struct ResilientClientBuilder {
    policy: RecoveryPolicy,
    backend: Option<Arc<dyn CompletionBackend>>,
    /// Override base URL (primarily for testing with mock servers)
    base_url_override: Option<String>,
    timeout: Option<Duration>,
}

impl ResilientClientBuilder {
    pub fn new() -> Self {
        Self {
            policy: RecoveryPolicy::default(),
            backend: None,
            base_url_override: None,
            timeout: None,
        }
    }

    /// Replace the recovery policy.
    pub fn policy(mut self, policy: RecoveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a custom backend instead of the HTTP transport.
    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Override the base URL of the HTTP transport.
    pub fn base_url_override(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    /// Per-request HTTP timeout. Defaults to `GEO_HTTP_TIMEOUT_SECS` or 60s.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ResilientClient> {
        self.policy.validate()?;

        let backend: Arc<dyn CompletionBackend> = match self.backend {
            Some(b) => b,
            None => {
                let base = self
                    .base_url_override
                    .unwrap_or_else(crate::transport::http::env_base_url);
                let timeout = self
                    .timeout
                    .unwrap_or_else(crate::transport::http::env_timeout);
                Arc::new(HttpTransport::new(&base, timeout)?)
            }
        };

        tracing::debug!(
            models = ?self.policy.models,
            rate_limit_retries = self.policy.rate_limit_retries,
            "resilient client built"
        );

        Ok(ResilientClient {
            policy: Arc::new(self.policy),
            backend,
        })
    }
}

impl Default for ResilientClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
