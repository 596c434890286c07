//! LLM — chat-completion access for explanations and follow-ups.
//!
//! DESIGN
//! ======
//! [`ApiClient`] turns a selection or a follow-up question into a message
//! list and hands it to an [`LlmChat`] provider. The production provider is
//! [`openrouter::OpenRouterClient`]; tests substitute a mock. The client
//! never retries: every failure is returned to the caller as-is.

pub mod config;
pub mod openrouter;
pub mod types;

use std::sync::Arc;

use tracing::info;

use crate::settings::{DEFAULT_SYSTEM_INSTRUCTIONS, Settings};
pub use types::LlmChat;
use types::{ChatRequest, ConversationTurn, LlmError, Role};

/// Prompt wrapper for the selected text.
#[must_use]
pub fn explain_prompt(text: &str) -> String {
    format!("Please explain this text: \"{text}\"")
}

fn system_turn(settings: &Settings) -> ConversationTurn {
    let instructions = settings.system_instructions.trim();
    if instructions.is_empty() {
        ConversationTurn::system(DEFAULT_SYSTEM_INSTRUCTIONS)
    } else {
        ConversationTurn::system(instructions)
    }
}

/// `[system, user(prompt)]` for a first explanation.
#[must_use]
pub fn explain_messages(text: &str, settings: &Settings) -> Vec<ConversationTurn> {
    vec![system_turn(settings), ConversationTurn::user(explain_prompt(text))]
}

/// `[system, ...history, user(question)]` for a follow-up. System turns in
/// the supplied history are dropped; the configured instructions lead.
#[must_use]
pub fn follow_up_messages(history: &[ConversationTurn], question: &str, settings: &Settings) -> Vec<ConversationTurn> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(system_turn(settings));
    messages.extend(
        history
            .iter()
            .filter(|turn| turn.role != Role::System)
            .cloned(),
    );
    messages.push(ConversationTurn::user(question));
    messages
}

// =============================================================================
// API CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ApiClient {
    llm: Arc<dyn LlmChat>,
}

impl ApiClient {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmChat>) -> Self {
        Self { llm }
    }

    /// Ask for an explanation of `text`.
    ///
    /// # Errors
    ///
    /// Returns the provider's classified [`LlmError`].
    pub async fn explain(&self, text: &str, settings: &Settings) -> Result<String, LlmError> {
        info!(model = %settings.model, text_len = text.len(), "llm: explain");
        let request = ChatRequest {
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            messages: explain_messages(text, settings),
        };
        self.llm.complete(&request).await
    }

    /// Continue a conversation with `question`.
    ///
    /// # Errors
    ///
    /// Returns the provider's classified [`LlmError`].
    pub async fn follow_up(
        &self,
        history: &[ConversationTurn],
        question: &str,
        settings: &Settings,
    ) -> Result<String, LlmError> {
        info!(model = %settings.model, turns = history.len(), "llm: follow-up");
        let request = ChatRequest {
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            messages: follow_up_messages(history, question, settings),
        };
        self.llm.complete(&request).await
    }

    /// Check that `api_key` is accepted by the provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's classified [`LlmError`].
    pub async fn test_connection(&self, api_key: &str) -> Result<(), LlmError> {
        self.llm.check_key(api_key).await
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
