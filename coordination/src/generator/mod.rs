//! Response generation seam
//!
//! Text generation is an external capability. The engine only sees the
//! [`ResponseGenerator`] trait; [`HttpResponseGenerator`] is the stock
//! adapter for an OpenAI-compatible chat-completions router.

pub mod confidence;
pub mod http;
pub mod parse;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use confidence::{ConfidenceEstimator, MarkerConfidence, DEFAULT_FALLBACK_CONFIDENCE};
pub use http::{HttpGeneratorConfig, HttpResponseGenerator};
pub use parse::{parse_response, ParsedResponse};

/// Error returned by a response generator. Always recoverable per participant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Empty response")]
    EmptyResponse,

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation failed: {0}")]
    Failed(String),
}

/// Sampling options for one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Role tag of the participant the call is made for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Correlation id for this call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 0.9,
            role: None,
            request_id: None,
        }
    }
}

impl GenerationOptions {
    /// Defaults for the final synthesis call
    pub fn synthesis() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.3,
            top_p: 0.9,
            role: None,
            request_id: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Attach a fresh request id
    pub fn with_new_request_id(mut self) -> Self {
        self.request_id = Some(uuid::Uuid::new_v4().to_string());
        self
    }
}

/// External text-generation capability
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate text for a prompt
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;
}

/// Shared reference to a ResponseGenerator
pub type SharedGenerator = Arc<dyn ResponseGenerator>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = GenerationOptions::default();
        assert_eq!(options.max_tokens, 1024);
        assert!(options.role.is_none());
        assert!(GenerationOptions::synthesis().temperature < options.temperature);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = GenerationOptions::default().with_role("cfo").with_new_request_id();
        let b = GenerationOptions::default().with_role("cfo").with_new_request_id();
        assert_eq!(a.role.as_deref(), Some("cfo"));
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn test_options_serde_skips_empty_tags() {
        let json = serde_json::to_value(GenerationOptions::default()).unwrap();
        assert!(json.get("role").is_none());
        assert!(json.get("request_id").is_none());
    }
}
