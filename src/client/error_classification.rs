//! Per-attempt failure classification.
//!
//! Maps one backend outcome (status + body, or a transport error) onto the
//! small set of classes the policy engine acts on.

use crate::transport::{BackendReply, TransportError};
use crate::types::GenerateResponse;

/// Why a single attempt did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// 429: the model is valid but busy.
    RateLimited {
        retry_after_ms: Option<u32>,
        message: String,
    },
    /// 503: the model is temporarily unusable.
    Overloaded { message: String },
    /// 404: the model name does not exist for this key/region.
    ModelNotFound { message: String },
    /// The credential was rejected.
    InvalidCredential { status: Option<u16>, message: String },
    /// 200 without a single candidate (includes blocked prompts).
    EmptyCandidates { block_reason: Option<String> },
    /// No HTTP status, or a success body that was not valid JSON.
    Transport { message: String },
    /// Any other non-success status.
    Http { status: u16, message: String },
}

impl AttemptFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Overloaded { .. } => Some(503),
            Self::ModelNotFound { .. } => Some(404),
            Self::InvalidCredential { status, .. } => *status,
            Self::EmptyCandidates { .. } => Some(200),
            Self::Transport { .. } => None,
            Self::Http { status, .. } => Some(*status),
        }
    }

    /// Short label used in logs and attempt records.
    pub fn class(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Overloaded { .. } => "overloaded",
            Self::ModelNotFound { .. } => "model_not_found",
            Self::InvalidCredential { .. } => "invalid_credential",
            Self::EmptyCandidates { .. } => "empty_candidates",
            Self::Transport { .. } => "transport",
            Self::Http { .. } => "http_error",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::RateLimited { message, .. }
            | Self::Overloaded { message }
            | Self::ModelNotFound { message }
            | Self::InvalidCredential { message, .. }
            | Self::Transport { message }
            | Self::Http { message, .. } => message.clone(),
            Self::EmptyCandidates {
                block_reason: Some(reason),
            } => format!("prompt blocked: {}", reason),
            Self::EmptyCandidates { block_reason: None } => {
                "response contained no candidates".to_string()
            }
        }
    }
}

/// True when an error text names the API key as invalid.
pub(crate) fn mentions_invalid_credential(text: &str) -> bool {
    if text.contains("API_KEY_INVALID") {
        return true;
    }
    let t = text.to_lowercase();
    t.contains("api key not valid")
        || t.contains("api key expired")
        || t.contains("invalid api key")
        || t.contains("api_key_invalid")
}

/// Pull `error.message` out of a JSON error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Classify a reply that reached the backend.
///
/// Success requires a 2xx status, a JSON body and at least one candidate.
pub(crate) fn classify_reply(reply: &BackendReply) -> Result<GenerateResponse, AttemptFailure> {
    let status = reply.status;

    if (200..300).contains(&status) {
        let body: GenerateResponse =
            serde_json::from_str(&reply.body).map_err(|e| AttemptFailure::Transport {
                message: format!("malformed response body: {}", e),
            })?;
        if body.candidates.is_empty() {
            return Err(AttemptFailure::EmptyCandidates {
                block_reason: body.block_reason().map(|s| s.to_string()),
            });
        }
        return Ok(body);
    }

    let message = error_message(&reply.body);
    let failure = match status {
        401 => AttemptFailure::InvalidCredential {
            status: Some(status),
            message,
        },
        400 | 403 if mentions_invalid_credential(&reply.body) => {
            AttemptFailure::InvalidCredential {
                status: Some(status),
                message,
            }
        }
        404 => AttemptFailure::ModelNotFound { message },
        429 => AttemptFailure::RateLimited {
            retry_after_ms: reply.retry_after_ms,
            message,
        },
        503 => AttemptFailure::Overloaded { message },
        _ => AttemptFailure::Http { status, message },
    };
    Err(failure)
}

/// Classify an attempt that never got a status back.
pub(crate) fn classify_transport(err: &TransportError) -> AttemptFailure {
    let message = err.to_string();
    if mentions_invalid_credential(&message) {
        AttemptFailure::InvalidCredential {
            status: None,
            message,
        }
    } else {
        AttemptFailure::Transport { message }
    }
}
