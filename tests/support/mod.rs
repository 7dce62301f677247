//! Scripted in-memory backend for driving the fallback state machine.

#![allow(dead_code)]

use async_trait::async_trait;
use geo_resilient_client::{
    BackendReply, CompletionBackend, RecoveryPolicy, RequestPayload, ResilientClient,
    ResilientClientBuilder, TransportError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const KEY_INVALID_BODY: &str = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#;

#[derive(Debug, Clone)]
pub enum Step {
    Reply(BackendReply),
    Transport(String),
}

pub fn ok(text: &str) -> Step {
    let body = serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] }, "finishReason": "STOP" }]
    });
    Step::Reply(BackendReply::new(200, body.to_string()))
}

pub fn status(code: u16) -> Step {
    Step::Reply(BackendReply::new(
        code,
        format!(r#"{{"error":{{"code":{},"message":"status {}"}}}}"#, code, code),
    ))
}

pub fn rate_limited_after(ms: u32) -> Step {
    Step::Reply(BackendReply::new(429, "Resource has been exhausted").with_retry_after_ms(ms))
}

pub fn empty_candidates() -> Step {
    Step::Reply(BackendReply::new(200, r#"{"candidates":[]}"#))
}

pub fn bad_key(code: u16) -> Step {
    Step::Reply(BackendReply::new(code, KEY_INVALID_BODY))
}

pub fn transport(msg: &str) -> Step {
    Step::Transport(msg.to_string())
}

#[derive(Debug, Clone)]
pub struct Call {
    pub model: String,
    pub had_tools: bool,
    pub at: Instant,
}

/// Per-model queues of replies; a model with an empty queue answers with its
/// `always` step, or 404 when none was set.
#[derive(Default)]
pub struct ScriptedBackend {
    queues: Mutex<HashMap<String, VecDeque<Step>>>,
    always: Mutex<HashMap<String, Step>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, model: &str, step: Step) -> Self {
        self.queues
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(step);
        self
    }

    pub fn times(mut self, model: &str, n: usize, step: Step) -> Self {
        for _ in 0..n {
            self = self.then(model, step.clone());
        }
        self
    }

    pub fn always(self, model: &str, step: Step) -> Self {
        self.always
            .lock()
            .unwrap()
            .insert(model.to_string(), step);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn generate(
        &self,
        model: &str,
        _api_key: &str,
        payload: &RequestPayload,
    ) -> Result<BackendReply, TransportError> {
        self.calls.lock().unwrap().push(Call {
            model: model.to_string(),
            had_tools: payload.has_tools(),
            at: Instant::now(),
        });

        let queued = self
            .queues
            .lock()
            .unwrap()
            .get_mut(model)
            .and_then(|q| q.pop_front());
        let step = queued
            .or_else(|| self.always.lock().unwrap().get(model).cloned())
            .unwrap_or_else(|| status(404));

        match step {
            Step::Reply(reply) => Ok(reply),
            Step::Transport(msg) => Err(TransportError::Other(msg)),
        }
    }
}

/// Policy over `models` with the production retry ceiling and delays.
pub fn policy(models: &[&str]) -> RecoveryPolicy {
    RecoveryPolicy::new(models.iter().copied())
}

pub fn build_client(backend: Arc<ScriptedBackend>, policy: RecoveryPolicy) -> ResilientClient {
    ResilientClientBuilder::new()
        .policy(policy)
        .backend(backend)
        .build()
        .expect("client builds")
}

pub fn gaps(calls: &[Call]) -> Vec<Duration> {
    calls.windows(2).map(|w| w[1].at - w[0].at).collect()
}

/// Paused-clock sleeps land on the timer wheel's millisecond ticks.
pub fn assert_gap(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(5),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}
