//! 弹性调用核心：按模型优先级逐个尝试，处理限流重试、模型切换与工具降级。
//!
//! The resilient call state machine.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::error_classification::{classify_reply, classify_transport, AttemptFailure};
use super::policy::{Decision, PolicyEngine, RecoveryPolicy};
use super::types::{AttemptRecord, CallStats};
use crate::error::ClassifiedError;
use crate::error_code::ErrorKind;
use crate::transport::CompletionBackend;
use crate::types::{NormalizedResponse, RequestPayload};

/// Position in the fallback walk. Created fresh for every `call()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CallAttempt {
    pub model_index: usize,
    pub tools_stripped: bool,
    pub retries: u32,
    /// Last backoff slept on the current model.
    pub last_delay: Duration,
}

impl CallAttempt {
    fn start() -> Self {
        Self {
            model_index: 0,
            tools_stripped: false,
            retries: 0,
            last_delay: Duration::ZERO,
        }
    }

    fn next_model(self) -> Self {
        Self {
            model_index: self.model_index + 1,
            tools_stripped: self.tools_stripped,
            retries: 0,
            last_delay: Duration::ZERO,
        }
    }

    fn restart_without_tools() -> Self {
        Self {
            model_index: 0,
            tools_stripped: true,
            retries: 0,
            last_delay: Duration::ZERO,
        }
    }
}

/// Multi-model generateContent client.
///
/// Holds only read-only state, so one instance can serve any number of
/// concurrent calls; each call walks its own fallback sequence.
#[derive(Clone)]
pub struct ResilientClient {
    pub(crate) policy: Arc<RecoveryPolicy>,
    pub(crate) backend: Arc<dyn CompletionBackend>,
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ResilientClient {
    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    /// Issue `payload`, recovering per the client's policy.
    ///
    /// Returns the first response with at least one candidate, stamped with
    /// the model that produced it, or a single classified error.
    pub async fn call(
        &self,
        api_key: &str,
        payload: &RequestPayload,
    ) -> Result<NormalizedResponse, ClassifiedError> {
        self.call_with_stats(api_key, payload)
            .await
            .map(|(resp, _)| resp)
    }

    /// Same as [`call`](Self::call), also returning per-attempt statistics.
    pub async fn call_with_stats(
        &self,
        api_key: &str,
        payload: &RequestPayload,
    ) -> Result<(NormalizedResponse, CallStats), ClassifiedError> {
        if api_key.trim().is_empty() {
            return Err(ClassifiedError::new(
                ErrorKind::InvalidCredential,
                "An API key is required to call the completion service.",
            ));
        }

        let policy = self.policy.as_ref();
        let engine = PolicyEngine::new(policy);
        let start = Instant::now();

        let mut state = CallAttempt::start();
        let mut stripped: Option<RequestPayload> = None;
        let mut stats = CallStats::default();
        let mut last: Option<(String, AttemptFailure)> = None;

        loop {
            if state.model_index >= policy.models.len() {
                if !state.tools_stripped && policy.strip_tools_on_exhaustion && payload.has_tools()
                {
                    warn!(
                        models = policy.models.len(),
                        backend_calls = stats.backend_calls,
                        "all models failed with tools enabled, retrying without tools"
                    );
                    stripped = Some(payload.without_tools());
                    state = CallAttempt::restart_without_tools();
                    continue;
                }
                return Err(Self::exhausted(last, stats.backend_calls));
            }

            let model = policy.models[state.model_index].as_str();
            let body = stripped.as_ref().unwrap_or(payload);

            stats.backend_calls += 1;
            let outcome = match self.backend.generate(model, api_key, body).await {
                Ok(reply) => classify_reply(&reply),
                Err(e) => Err(classify_transport(&e)),
            };

            match outcome {
                Ok(resp) => {
                    stats.attempts.push(AttemptRecord {
                        model: model.to_string(),
                        tools_stripped: state.tools_stripped,
                        retry: state.retries,
                        status: Some(200),
                        outcome: "ok",
                    });
                    stats.duration_ms = start.elapsed().as_millis();
                    info!(
                        model,
                        tools_stripped = state.tools_stripped,
                        backend_calls = stats.backend_calls,
                        duration_ms = stats.duration_ms as u64,
                        "completion served"
                    );
                    return Ok((
                        NormalizedResponse::new(resp, model, state.tools_stripped),
                        stats,
                    ));
                }
                Err(failure) => {
                    stats.attempts.push(AttemptRecord {
                        model: model.to_string(),
                        tools_stripped: state.tools_stripped,
                        retry: state.retries,
                        status: failure.status(),
                        outcome: failure.class(),
                    });
                    warn!(
                        model,
                        http_status = failure.status(),
                        error_class = failure.class(),
                        retry = state.retries,
                        tools_stripped = state.tools_stripped,
                        "attempt failed: {}",
                        failure.message()
                    );

                    match engine.decide(&failure, state.retries, state.last_delay) {
                        Decision::FailFast => {
                            return Err(ClassifiedError::new(
                                ErrorKind::InvalidCredential,
                                format!(
                                    "The API key was rejected ({}). Check the key and try again.",
                                    failure.message()
                                ),
                            )
                            .with_backend_calls(stats.backend_calls)
                            .with_last_model(model)
                            .with_last_status(failure.status()));
                        }
                        Decision::RetrySameModel { delay } => {
                            debug!(
                                model,
                                retry = state.retries + 1,
                                delay_ms = delay.as_millis() as u64,
                                "rate limited, retrying same model"
                            );
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            state.retries += 1;
                            state.last_delay = delay;
                        }
                        Decision::NextModel => {
                            state = state.next_model();
                        }
                    }
                    last = Some((model.to_string(), failure));
                }
            }
        }
    }

    /// Terminal error for a walk that ran off the end of the list.
    fn exhausted(last: Option<(String, AttemptFailure)>, backend_calls: u32) -> ClassifiedError {
        let Some((model, failure)) = last else {
            return ClassifiedError::new(
                ErrorKind::AllModelsExhausted,
                "No model produced a response.",
            )
            .with_backend_calls(backend_calls);
        };

        let (kind, message) = match &failure {
            AttemptFailure::RateLimited { .. } => (
                ErrorKind::QuotaExceeded,
                format!(
                    "API quota exceeded on every available model (last: {}). Wait a minute or check your billing settings.",
                    model
                ),
            ),
            AttemptFailure::Transport { .. } | AttemptFailure::Http { .. } => (
                ErrorKind::TransientBackendFailure,
                format!(
                    "The AI service is temporarily unavailable ({}: {}). Please retry shortly.",
                    model,
                    failure.message()
                ),
            ),
            _ => (
                ErrorKind::AllModelsExhausted,
                format!(
                    "All models failed to produce a response. Last error from {}: {}",
                    model,
                    failure.message()
                ),
            ),
        };

        ClassifiedError::new(kind, message)
            .with_backend_calls(backend_calls)
            .with_last_status(failure.status())
            .with_last_model(model)
    }
}
