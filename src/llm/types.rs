//! LLM types — conversation turns, request shape, and errors.
//!
//! Provider-neutral types shared by the `OpenRouter` client and the mocks
//! used in tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by chat-completion calls. The `Display` text is what a
/// UI surface shows after "Error:".
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// 401 from the provider.
    #[error("Authentication error: the API key was rejected. Check it in the extension options.")]
    Authentication,

    /// 403 from the provider.
    #[error("Access denied: this API key is not allowed to use the requested model.")]
    AccessDenied,

    /// 404 from the provider, usually a bad model id.
    #[error("Model not found: check the model identifier in the extension options.")]
    ModelNotFound,

    /// 429 from the provider.
    #[error("Rate limit exceeded: please wait a moment and try again.")]
    RateLimited,

    /// Any other non-success status, with the provider's message when it sent one.
    #[error("API error (status {status}){}", detail_suffix(.message))]
    Api { status: u16, message: Option<String> },

    /// The request never got a response.
    #[error("Network error: could not reach the API ({0}).")]
    Connectivity(String),

    /// The response body did not have the expected shape.
    #[error("Invalid response from API: {0}")]
    MalformedResponse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

fn detail_suffix(message: &Option<String>) -> String {
    message.as_deref().map_or_else(String::new, |m| format!(": {m}"))
}

impl ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Authentication => "E_AUTHENTICATION",
            Self::AccessDenied => "E_ACCESS_DENIED",
            Self::ModelNotFound => "E_MODEL_NOT_FOUND",
            Self::RateLimited => "E_RATE_LIMITED",
            Self::Api { .. } => "E_API_RESPONSE",
            Self::Connectivity(_) => "E_CONNECTIVITY",
            Self::MalformedResponse(_) => "E_MALFORMED_RESPONSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Connectivity(_) | Self::Api { status: 500..=599, .. })
    }
}

/// Map a non-success HTTP status (and its body) to an [`LlmError`].
#[must_use]
pub fn classify_status(status: u16, body: &str) -> LlmError {
    match status {
        401 => LlmError::Authentication,
        403 => LlmError::AccessDenied,
        404 => LlmError::ModelNotFound,
        429 => LlmError::RateLimited,
        _ => LlmError::Api { status, message: provider_error_message(body) },
    }
}

/// Extract the provider's error message from an error body, if any.
///
/// Accepts `{"error": {"message": ".."}}`, `{"error": ".."}` and
/// `{"message": ".."}`.
fn provider_error_message(body: &str) -> Option<String> {
    let root: Value = serde_json::from_str(body).ok()?;
    let message = match root.get("error") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(obj) => obj.get("message").and_then(Value::as_str),
        None => root.get("message").and_then(Value::as_str),
    }?;
    let message = message.trim();
    if message.is_empty() { None } else { Some(message.to_string()) }
}

// =============================================================================
// CONVERSATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message in the history sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A fully-built chat-completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub api_key: String,
    pub model: String,
    pub messages: Vec<ConversationTurn>,
}

// =============================================================================
// LLM CHAT TRAIT
// =============================================================================

/// Provider seam for chat completions. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LlmChat: Send + Sync {
    /// Send a chat-completion request and return the assistant's text.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] classified from the HTTP status, transport
    /// failure, or response shape.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;

    /// Validate an API key against the provider.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the key is rejected or the provider is
    /// unreachable.
    async fn check_key(&self, api_key: &str) -> Result<(), LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
