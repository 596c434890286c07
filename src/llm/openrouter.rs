//! `OpenRouter` chat-completions client.
//!
//! Speaks the OpenAI-compatible `/chat/completions` endpoint with bearer auth
//! plus the `HTTP-Referer` / `X-Title` identification headers. Non-success
//! statuses are classified by [`classify_status`]; nothing is retried.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::config::LlmConfig;
use super::types::{ChatRequest, ConversationTurn, LlmChat, LlmError, classify_status};

pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    referer: String,
    title: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterClient {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            referer: config.referer.clone(),
            title: config.title.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a prepared request and return the body of a 2xx response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, LlmError> {
        let response = request
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .send()
            .await
            .map_err(|e| LlmError::Connectivity(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string());
        settle(status, body)
    }
}

/// Turn a status and a (possibly unreadable) body into the call result.
///
/// The status decides the error kind; a body that failed to arrive only
/// matters on success, where it is the payload.
fn settle(status: reqwest::StatusCode, body: Result<String, String>) -> Result<String, LlmError> {
    if status.is_success() {
        return body.map_err(LlmError::Connectivity);
    }
    warn!(status = status.as_u16(), "openrouter: non-success status");
    let body = body.unwrap_or_else(|e| {
        debug!(error = %e, "openrouter: error body unreadable");
        String::new()
    });
    Err(classify_status(status.as_u16(), &body))
}

#[async_trait::async_trait]
impl LlmChat for OpenRouterClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = CcRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(model = %request.model, messages = request.messages.len(), "openrouter: chat completion");
        let builder = self
            .http
            .post(self.url("/chat/completions"))
            .bearer_auth(&request.api_key)
            .json(&body);
        let text = self.send(builder).await?;
        parse_chat_completions_response(&text)
    }

    async fn check_key(&self, api_key: &str) -> Result<(), LlmError> {
        let builder = self
            .http
            .get(self.url("/models"))
            .bearer_auth(api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        self.send(builder).await.map(|_| ())
    }
}

// =============================================================================
// CHAT COMPLETIONS WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationTurn],
    temperature: f32,
    max_tokens: u32,
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// Pull `choices[0].message.content` out of a chat-completions body.
pub(crate) fn parse_chat_completions_response(json_text: &str) -> Result<String, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

    let Some(message) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
    else {
        return Err(LlmError::MalformedResponse("missing choices[0].message".to_string()));
    };

    let Some(content) = message.get("content").and_then(Value::as_str) else {
        return Err(LlmError::MalformedResponse("missing choices[0].message.content".to_string()));
    };
    Ok(content.to_string())
}

#[cfg(test)]
#[path = "openrouter_test.rs"]
mod tests;
