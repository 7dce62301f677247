//! 终端错误分类：调用方最终看到的错误种类及其代码。
//!
//! Terminal error kinds surfaced by [`ResilientClient`](crate::ResilientClient).
//!
//! Every retry, backoff and fallback decision is resolved inside the client.
//! Only one of these kinds ever crosses the component boundary.
//!
//! | Code  | Kind                      | Meaning                                        |
//! |-------|---------------------------|------------------------------------------------|
//! | E1002 | `InvalidCredential`       | API key rejected, nothing else was attempted   |
//! | E2002 | `QuotaExceeded`           | List exhausted, last cause was repeated 429s   |
//! | E3001 | `TransientBackendFailure` | List exhausted, last cause was unclassified    |
//! | E3100 | `AllModelsExhausted`      | Every model (and the no-tools restart) failed  |
//!
//! ```rust
//! use geo_resilient_client::error_code::ErrorKind;
//!
//! let kind = ErrorKind::QuotaExceeded;
//! assert_eq!(kind.code(), "E2002");
//! assert!(kind.is_exhaustion());
//! assert!(!ErrorKind::InvalidCredential.is_exhaustion());
//! ```

use std::fmt;

/// Classification of a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend rejected the credential outright.
    InvalidCredential,
    /// Every model failed, including the tools-stripped restart when it applied.
    AllModelsExhausted,
    /// Exhausted, and the last observed cause was the rate-limit ceiling.
    QuotaExceeded,
    /// Exhausted, and the last observed cause was a transport error or an unclassified status.
    TransientBackendFailure,
}

impl ErrorKind {
    /// Returns the canonical code string (e.g., `"E1002"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredential => "E1002",
            Self::QuotaExceeded => "E2002",
            Self::TransientBackendFailure => "E3001",
            Self::AllModelsExhausted => "E3100",
        }
    }

    /// Returns the snake_case name (e.g., `"invalid_credential"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidCredential => "invalid_credential",
            Self::AllModelsExhausted => "all_models_exhausted",
            Self::QuotaExceeded => "quota_exceeded",
            Self::TransientBackendFailure => "transient_backend_failure",
        }
    }

    /// True for every kind produced by walking off the end of the model list.
    #[inline]
    pub fn is_exhaustion(&self) -> bool {
        !matches!(self, Self::InvalidCredential)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
