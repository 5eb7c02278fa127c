//! OpenAI-compatible chat-completions generator

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationError, GenerationOptions, ResponseGenerator};

/// Default router endpoint
pub const DEFAULT_ROUTER_URL: &str = "http://localhost:8000/v1/chat/completions";

pub const DEFAULT_MODEL: &str = "executive";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Configuration for [`HttpResponseGenerator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpGeneratorConfig {
    pub router_url: String,
    /// Model name sent with every request
    pub model: String,
    pub request_timeout_secs: u64,
}

impl Default for HttpGeneratorConfig {
    fn default() -> Self {
        Self {
            router_url: DEFAULT_ROUTER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Posts prompts to a chat-completions router
pub struct HttpResponseGenerator {
    http: reqwest::Client,
    config: HttpGeneratorConfig,
}

impl HttpResponseGenerator {
    pub fn new(config: HttpGeneratorConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpGeneratorConfig {
        &self.config
    }

    fn system_prompt(role: Option<&str>) -> String {
        match role {
            Some(role) => format!(
                "You are the '{}' member of an executive team advising on a decision. \
                 Answer with a 'Reasoning:' paragraph and a 'Recommendations:' list. \
                 End with your confidence (0.0-1.0) in brackets like [confidence: 0.85].",
                role
            ),
            None => "You synthesize executive input into one clear decision.".to_string(),
        }
    }

    fn build_request(&self, prompt: &str, options: &GenerationOptions) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Self::system_prompt(options.role.as_deref()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            user: options.request_id.clone(),
        }
    }

    fn extract_content(response: ChatResponse) -> Result<String, GenerationError> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(content)
    }
}

#[async_trait]
impl ResponseGenerator for HttpResponseGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let request = self.build_request(prompt, options);

        let response = self
            .http
            .post(&self.config.router_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(Duration::from_secs(self.config.request_timeout_secs))
                } else {
                    GenerationError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend { status, body });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        let content = Self::extract_content(chat_response)?;

        debug!(
            role = options.role.as_deref().unwrap_or("synthesis"),
            request_id = options.request_id.as_deref().unwrap_or("-"),
            latency_ms = start.elapsed().as_millis() as u64,
            chars = content.len(),
            "Generation complete"
        );

        Ok(content)
    }
}
