//! Resilient completion client.
//!
//! [`ResilientClient`] is the only entry point; the policy, per-attempt
//! classification and builder live in the submodules.

pub mod builder;
pub mod core;
mod error_classification;
pub mod policy;
pub mod types;

pub use builder::ResilientClientBuilder;
pub use self::core::ResilientClient;
pub use policy::{RecoveryPolicy, DEFAULT_MODELS, DEFAULT_RATE_LIMIT_RETRIES};
pub use types::{AttemptRecord, CallStats};
