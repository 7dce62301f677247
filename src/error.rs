use crate::error_code::ErrorKind;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "policy.models", "base_url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "client_builder", "http_transport")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The single failure a caller of [`ResilientClient::call`](crate::ResilientClient::call) sees.
///
/// `Display` yields `message` alone so it can be shown to end users as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    /// Backend round-trips made before giving up.
    pub backend_calls: u32,
    /// Model targeted by the last attempt, if any attempt was made.
    pub last_model: Option<String>,
    /// HTTP status of the last attempt, if it got that far.
    pub last_status: Option<u16>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            backend_calls: 0,
            last_model: None,
            last_status: None,
        }
    }

    pub fn with_backend_calls(mut self, calls: u32) -> Self {
        self.backend_calls = calls;
        self
    }

    pub fn with_last_model(mut self, model: impl Into<String>) -> Self {
        self.last_model = Some(model.into());
        self
    }

    pub fn with_last_status(mut self, status: Option<u16>) -> Self {
        self.last_status = status;
        self
    }
}

/// Unified error type for the crate.
///
/// `call()` itself only ever yields [`ClassifiedError`]; the other variants come
/// from building clients and from the transport layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("{} ({})", .0, .0.kind.name())]
    Classified(#[from] ClassifiedError),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The terminal classification, when this error came out of `call()`.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Classified(e) => Some(e.kind),
            _ => None,
        }
    }
}
