//! Document Classification
//!
//! ## Flow
//!
//! ```text
//! extracted text ──► prompts::build_request ──► Classifier (remote, untrusted)
//!                                                   │
//!        ClassificationResult ◄── parse_response ◄──┘  (retry on transient errors)
//! ```
//!
//! The remote reply is treated purely as data: it is located, parsed as a
//! JSON object, type-checked field by field, and only then defaulted. Nothing
//! from it reaches the filesystem without going through `routing::sanitize`.

mod client;
mod openai;
pub mod prompts;
mod retry;
mod types;
mod utils;

pub use client::{parse_response, ClassificationClient, ClassificationRequest, Classifier};
pub use openai::OpenAiClassifier;
pub use retry::RetryPolicy;
pub use types::{
    ClassificationResult, DEFAULT_DOCUMENT_TYPE, DEFAULT_FOLDER_PATH,
};

use serde::Serialize;

/// Why a document could not be classified
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ClassificationFailure {
    /// Network error, timeout, or server-side failure (retryable)
    #[error("classification service unavailable: {reason}")]
    ServiceUnavailable { reason: String },
    /// Credentials were refused
    #[error("classification service rejected credentials: {reason}")]
    AuthError { reason: String },
    /// Provider asked us to slow down (retryable)
    #[error("classification service rate limited{}", .retry_after_secs.map(|s| format!(", retry after {}s", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },
    /// Provider refused the request itself (bad request, payload too large)
    #[error("classification request rejected ({status}): {reason}")]
    RequestRejected { status: u16, reason: String },
    /// Reply did not match the expected response shape
    #[error("malformed classification response: {reason}")]
    ResponseParseError { reason: String },
}

impl ClassificationFailure {
    /// Transient failures worth another attempt after backoff
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable { .. } | Self::RateLimited { .. }
        )
    }

    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        Self::ResponseParseError {
            reason: reason.into(),
        }
    }
}
