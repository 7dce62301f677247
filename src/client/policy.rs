use std::time::Duration;

use super::error_classification::AttemptFailure;
use crate::{Error, ErrorContext, Result};

/// Model priority list, highest preference first.
pub const DEFAULT_MODELS: &[&str] = &["gemini-1.5-flash", "gemini-1.5-pro", "gemini-2.0-flash-exp"];

/// Same-model retries allowed after a 429 before moving on.
pub const DEFAULT_RATE_LIMIT_RETRIES: u32 = 2;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(8_000);

/// Recovery policy for one client.
///
/// `RecoveryPolicy::default()` is the fixed production policy. Tests swap in
/// their own model list and delays; the state machine does not change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPolicy {
    pub models: Vec<String>,
    pub rate_limit_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Restart the list once without `tools` after exhausting it with them.
    pub strip_tools_on_exhaustion: bool,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            rate_limit_retries: DEFAULT_RATE_LIMIT_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            strip_tools_on_exhaustion: true,
        }
    }
}

impl RecoveryPolicy {
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: models.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_rate_limit_retries(mut self, retries: u32) -> Self {
        self.rate_limit_retries = retries;
        self
    }

    pub fn with_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    pub fn with_tool_stripping(mut self, enable: bool) -> Self {
        self.strip_tools_on_exhaustion = enable;
        self
    }

    /// Worst-case backend round-trips for one `call()`.
    pub fn max_backend_calls(&self) -> u32 {
        let passes = if self.strip_tools_on_exhaustion { 2 } else { 1 };
        let per_model = 1u32.saturating_add(self.rate_limit_retries);
        (self.models.len() as u32)
            .saturating_mul(per_model)
            .saturating_mul(passes)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(Error::configuration_with_context(
                "model priority list is empty",
                ErrorContext::new()
                    .with_field_path("policy.models")
                    .with_source("recovery_policy"),
            ));
        }
        if self.models.iter().any(|m| m.trim().is_empty()) {
            return Err(Error::configuration_with_context(
                "model names must not be blank",
                ErrorContext::new()
                    .with_field_path("policy.models")
                    .with_source("recovery_policy"),
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(Error::configuration_with_context(
                "base_delay exceeds max_delay",
                ErrorContext::new()
                    .with_field_path("policy.base_delay")
                    .with_details(format!(
                        "base={}ms max={}ms",
                        self.base_delay.as_millis(),
                        self.max_delay.as_millis()
                    ))
                    .with_source("recovery_policy"),
            ));
        }
        Ok(())
    }
}

/// Internal decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    RetrySameModel { delay: Duration },
    NextModel,
    FailFast,
}

/// Turns a classified attempt failure into the next state-machine move.
///
/// Keep this deterministic: the same failure at the same retry count always
/// yields the same decision.
pub(crate) struct PolicyEngine<'a> {
    policy: &'a RecoveryPolicy,
}

impl<'a> PolicyEngine<'a> {
    pub fn new(policy: &'a RecoveryPolicy) -> Self {
        Self { policy }
    }

    /// Exponential backoff (base * 2^retries), raised to the `Retry-After` hint
    /// and to the previous delay on this model, then capped.
    ///
    /// Delays on one model never shrink, whatever the server hints.
    fn backoff_delay(&self, retries: u32, retry_after_ms: Option<u32>, previous: Duration) -> Duration {
        let factor = 1u32.checked_shl(retries).unwrap_or(u32::MAX);
        let base_ms = u64::try_from(self.policy.base_delay.as_millis()).unwrap_or(u64::MAX);
        let computed = Duration::from_millis(base_ms.saturating_mul(factor as u64));
        let hinted = Duration::from_millis(retry_after_ms.map(u64::from).unwrap_or(0));
        computed
            .max(hinted)
            .max(previous)
            .min(self.policy.max_delay)
    }

    /// `retries` is the number of same-model retries already spent on the
    /// current model, `previous` the delay slept before the last of them.
    pub fn decide(&self, failure: &AttemptFailure, retries: u32, previous: Duration) -> Decision {
        match failure {
            AttemptFailure::InvalidCredential { .. } => Decision::FailFast,
            AttemptFailure::RateLimited { retry_after_ms, .. } => {
                if retries < self.policy.rate_limit_retries {
                    Decision::RetrySameModel {
                        delay: self.backoff_delay(retries, *retry_after_ms, previous),
                    }
                } else {
                    Decision::NextModel
                }
            }
            AttemptFailure::Overloaded { .. }
            | AttemptFailure::ModelNotFound { .. }
            | AttemptFailure::EmptyCandidates { .. }
            | AttemptFailure::Transport { .. }
            | AttemptFailure::Http { .. } => Decision::NextModel,
        }
    }
}
