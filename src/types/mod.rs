//! Wire types for the generateContent API.

pub mod payload;
pub mod response;

pub use payload::{Content, GenerationConfig, Part, RequestPayload};
pub use response::{
    Candidate, GenerateResponse, GroundingChunk, GroundingMetadata, NormalizedResponse,
    PromptFeedback, UsageMetadata, WebSource,
};
