//! OpenAI Chat Completions API client (non-streaming).
//!
//! Also works against OpenRouter, Ollama, and other OpenAI-compatible
//! endpoints via the `base_url` config field.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use webmark_core::{ConvertConfig, Result, WebmarkError};

use crate::MarkdownConverter;

const OPENAI_BASE_URL: &str = "https://api.openai.com";

const SYSTEM_PROMPT: &str = "You are a text-to-Markdown converter. The input is plain text \
    scraped from a web page. Reformat it into well-structured Markdown, preserving headings \
    and code blocks. Output the Markdown content directly, not wrapped in a code fence; \
    fences are fine for code the page itself contains.";

#[derive(Debug)]
pub struct OpenAiConverter {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiConverter {
    pub fn new(api_key: String, base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Resolve the API key from the configured environment variable.
    ///
    /// Called at the conversion stage, after the browser session has already
    /// been torn down, so a missing credential never leaks a browser process.
    pub fn from_env(config: &ConvertConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                WebmarkError::Authentication(format!(
                    "environment variable {} is not set",
                    config.api_key_env
                ))
            })?;
        Ok(Self::new(api_key, config.base_url.as_deref()))
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

fn build_request(text: &str, config: &ConvertConfig) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".into(),
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".into(),
                content: text.to_string(),
            },
        ],
        temperature: config.temperature,
        top_p: config.top_p,
        max_tokens: config.max_tokens,
    }
}

/// Map a non-2xx status onto the error taxonomy.
fn classify_error(status: u16, body: String) -> WebmarkError {
    match status {
        401 | 403 => WebmarkError::Authentication(format!("service rejected credentials ({status}): {body}")),
        402 | 429 => WebmarkError::RateLimitOrQuota(format!("({status}): {body}")),
        _ => WebmarkError::RemoteService { status, body },
    }
}

#[async_trait]
impl MarkdownConverter for OpenAiConverter {
    async fn convert(&self, text: &str, config: &ConvertConfig) -> Result<String> {
        let body = build_request(text, config);

        debug!(model = %body.model, base_url = %self.base_url, "Requesting Markdown conversion");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| WebmarkError::RemoteService {
                status: 0,
                body: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), text));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| WebmarkError::RemoteService {
            status: status.as_u16(),
            body: format!("invalid response body: {e}"),
        })?;

        let markdown = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| WebmarkError::RemoteService {
                status: status.as_u16(),
                body: "response contained no choices".to_string(),
            })?;

        info!(model = %config.model, chars = markdown.len(), "Markdown conversion complete");
        Ok(markdown)
    }
}
