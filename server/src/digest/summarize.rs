//! Summarization collaborator.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::gmail::client::MessageSummaryInput;

pub struct SummarizeRequest<'a> {
    pub rule_name: &'a str,
    pub mailbox: &'a str,
    pub message: &'a MessageSummaryInput,
}

/// Produces a short summary for one message, or nothing when the model
/// declines.
#[async_trait]
pub trait Summarizer {
    async fn summarize(&self, request: SummarizeRequest<'_>) -> Result<Option<String>>;
}

/// Summarizer backed by an OpenAI-compatible chat-completions endpoint
pub struct LlmSummarizer {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl LlmSummarizer {
    pub fn new(api_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, request: SummarizeRequest<'_>) -> Result<Option<String>> {
        let message = request.message;
        let body = message
            .body_text
            .as_deref()
            .unwrap_or(message.snippet.as_str());

        let payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": format!(
                        "You summarize emails for the '{}' digest of {}. \
                         Reply with two short plain-text sentences capturing \
                         what the email is about and any action it asks for.",
                        request.rule_name, request.mailbox
                    ),
                },
                {
                    "role": "user",
                    "content": format!(
                        "From: {}\nSubject: {}\n\n{}",
                        message.from, message.subject, body
                    ),
                },
            ],
            "max_tokens": 160,
        });

        let mut http_request = self.http.post(&self.api_url).json(&payload);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request
            .send()
            .await
            .context("Summarization request failed")?
            .error_for_status()
            .context("Summarization backend rejected the request")?;

        let value: serde_json::Value = response
            .json()
            .await
            .context("Invalid summarization response")?;

        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(content)
    }
}
