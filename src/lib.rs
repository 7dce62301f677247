//! # geo-resilient-client
//!
//! 面向生成式内容接口的弹性调用客户端：多模型回退、限流重试与工具降级。
//!
//! Resilient multi-model client for the generateContent API.
//!
//! ## Overview
//!
//! Every feature that asks a generative model something (content optimization,
//! brand audits, drift monitoring, citation analysis) goes through one entry
//! point, [`ResilientClient::call`]. It walks a fixed model priority list and
//! decides, per failed attempt, whether to:
//!
//! - retry the same model after a backoff (HTTP 429, up to a fixed ceiling),
//! - move to the next model (503, 404, empty candidates, transport and other errors),
//! - fail immediately (the API key was rejected),
//! - or, once the whole list has failed with `tools` declared, restart it a
//!   single time with the tools removed.
//!
//! The caller sees either one [`NormalizedResponse`] stamped with the model
//! that served it, or one [`ClassifiedError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geo_resilient_client::{RequestPayload, ResilientClientBuilder};
//!
//! #[tokio::main]
//! async fn main() -> geo_resilient_client::Result<()> {
//!     let client = ResilientClientBuilder::new().build()?;
//!
//!     let payload = RequestPayload::user_text("How do AI assistants describe Acme?")
//!         .with_google_search();
//!
//!     let resp = client.call("your-api-key", &payload).await?;
//!     println!("{} said: {:?}", resp.used_model, resp.text());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | State machine, recovery policy and builder |
//! | [`transport`] | Backend trait and the reqwest implementation |
//! | [`types`] | Request payload and response types |
//! | [`error_code`] | Terminal error kinds |
//! | [`credentials`] | API key lookup (keyring, environment) |

pub mod client;
pub mod credentials;
pub mod error_code;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{
    AttemptRecord, CallStats, RecoveryPolicy, ResilientClient, ResilientClientBuilder,
    DEFAULT_MODELS,
};
pub use error_code::ErrorKind;
pub use transport::{BackendReply, CompletionBackend, HttpTransport, TransportError};
pub use types::{NormalizedResponse, RequestPayload};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{ClassifiedError, Error, ErrorContext};
