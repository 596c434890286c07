//! Chat popup — conversation state for one selection.
//!
//! DESIGN
//! ======
//! The popup owns the displayed transcript and the turns replayed to the API
//! on follow-ups. It issues one request at a time: input is disabled while a
//! request is pending, and only the reply whose `parentId` matches the
//! pending request id is applied. Replies that arrive after `close()` or for
//! a superseded request are dropped.
//!
//! A follow-up question joins the replayed history only once its answer
//! arrives, so a failed follow-up leaves the history as it was.

use tracing::debug;
use uuid::Uuid;

use crate::config::StreamConfig;
use crate::envelope::{Event, Inbound, Outbound};
use crate::llm::explain_prompt;
use crate::llm::types::ConversationTurn;
use crate::render::Reveal;
use crate::router::Request;
use crate::settings::Settings;

/// One line of the displayed transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupMessage {
    User(String),
    Assistant(String),
    /// Already prefixed with `"Error: "`.
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingKind {
    Explain,
    FollowUp { question: String },
}

#[derive(Debug, Clone)]
struct Pending {
    id: Uuid,
    kind: PendingKind,
}

#[derive(Debug, Clone)]
pub struct ChatPopup {
    stream: StreamConfig,
    selected_text: Option<String>,
    history: Vec<ConversationTurn>,
    messages: Vec<PopupMessage>,
    pending: Option<Pending>,
    closed: bool,
    dark_mode: bool,
}

impl ChatPopup {
    #[must_use]
    pub fn new(stream: StreamConfig) -> Self {
        Self {
            stream,
            selected_text: None,
            history: Vec::new(),
            messages: Vec::new(),
            pending: None,
            closed: false,
            dark_mode: false,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[PopupMessage] {
        &self.messages
    }

    /// Turns a follow-up would replay.
    #[must_use]
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    #[must_use]
    pub fn input_disabled(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Latest assistant reply, for the copy button.
    #[must_use]
    pub fn last_reply(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            PopupMessage::Assistant(text) => Some(text.as_str()),
            _ => None,
        })
    }

    fn issue(&mut self, request: &Request, kind: PendingKind) -> Inbound {
        let inbound = request.to_inbound();
        let id = inbound.id.unwrap_or_else(Uuid::new_v4);
        self.pending = Some(Pending { id, kind });
        Inbound { id: Some(id), ..inbound }
    }

    fn start_explain(&mut self, text: &str, settings: &Settings) -> Inbound {
        self.history.clear();
        self.messages = vec![PopupMessage::User(text.to_string())];
        let request = Request::Explain { text: text.to_string(), settings: settings.clone() };
        self.issue(&request, PendingKind::Explain)
    }

    /// Show the popup for `text` and ask for its explanation.
    pub fn open(&mut self, text: &str, settings: &Settings) -> Inbound {
        self.closed = false;
        self.dark_mode = settings.dark_mode;
        self.selected_text = Some(text.to_string());
        self.start_explain(text, settings)
    }

    /// Ask again for the original selection. Ignored while a request is
    /// pending or before anything was opened.
    pub fn regenerate(&mut self, settings: &Settings) -> Option<Inbound> {
        if self.pending.is_some() || self.closed {
            return None;
        }
        let text = self.selected_text.clone()?;
        Some(self.start_explain(&text, settings))
    }

    /// Send a follow-up question carrying the conversation so far.
    pub fn submit_follow_up(&mut self, question: &str, settings: &Settings) -> Option<Inbound> {
        let question = question.trim();
        if question.is_empty() || self.pending.is_some() || self.closed {
            return None;
        }
        self.messages.push(PopupMessage::User(question.to_string()));
        let request = Request::FollowUp {
            history: self.history.clone(),
            question: question.to_string(),
            settings: settings.clone(),
        };
        Some(self.issue(&request, PendingKind::FollowUp { question: question.to_string() }))
    }

    /// Apply a reply. Returns a [`Reveal`] for the new assistant text so the
    /// host can stream it; `None` for errors and dropped replies.
    pub fn on_response(&mut self, outbound: &Outbound) -> Option<Reveal> {
        if self.closed {
            debug!(parent_id = ?outbound.parent_id, "popup: reply after close dropped");
            return None;
        }
        let is_pending = matches!((&self.pending, outbound.parent_id), (Some(p), Some(id)) if p.id == id);
        if !is_pending {
            debug!(parent_id = ?outbound.parent_id, "popup: stale reply dropped");
            return None;
        }
        let pending = self.pending.take()?;
        let body = &outbound.body;

        if let Some(error) = &body.error {
            self.messages.push(PopupMessage::Error(format!("Error: {error}")));
            return None;
        }

        let reply = match pending.kind {
            PendingKind::Explain => body.explanation.clone(),
            PendingKind::FollowUp { .. } => body.response.clone(),
        };
        let Some(text) = reply else {
            self.messages.push(PopupMessage::Error("Error: empty reply".to_string()));
            return None;
        };

        match pending.kind {
            PendingKind::Explain => {
                let prompt = explain_prompt(self.selected_text.as_deref().unwrap_or_default());
                self.history = vec![ConversationTurn::user(prompt), ConversationTurn::assistant(text.clone())];
            }
            PendingKind::FollowUp { question } => {
                self.history.push(ConversationTurn::user(question));
                self.history.push(ConversationTurn::assistant(text.clone()));
            }
        }
        self.messages.push(PopupMessage::Assistant(text.clone()));
        Some(Reveal::new(&text, self.stream.chunk_chars))
    }

    /// Server-pushed events. Settings changes re-apply the theme.
    pub fn on_event(&mut self, event: &Event) {
        if let Event::SettingsChanged { settings } = event {
            self.dark_mode = settings.dark_mode;
        }
    }

    /// Hide the popup. Any in-flight reply will be dropped.
    pub fn close(&mut self) {
        self.closed = true;
        self.pending = None;
    }
}

#[cfg(test)]
#[path = "popup_test.rs"]
mod tests;
