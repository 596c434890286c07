//! Envelope — the message type exchanged between UI surfaces and the
//! background service.
//!
//! ARCHITECTURE
//! ============
//! A UI surface sends one request envelope per user-triggered operation and
//! receives exactly one response envelope back. Requests are flat JSON
//! objects tagged by `action`; responses carry a single result field
//! (`explanation`, `response`, `settings`, `success`) or an `error` string.
//!
//! DESIGN
//! ======
//! - Correlation: the optional request `id` comes back as `parentId`.
//! - Errors never cross the boundary as anything but a string in `error`,
//!   plus a grepable `code` for logs and tooling.
//! - Server-pushed events (`openOptions`, `settingsChanged`, `render`) use `event`
//!   instead of `parentId` so a surface can tell them apart from replies.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::settings::Settings;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error envelopes.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// INBOUND
// =============================================================================

/// Raw inbound envelope. The payload stays untyped until the router parses
/// it so an unknown `action` can still be answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inbound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, Value>,
}

impl Inbound {
    /// Build an inbound envelope with a fresh correlation id.
    #[must_use]
    pub fn new(action: &str) -> Self {
        let mut payload = serde_json::Map::new();
        payload.insert("action".into(), Value::String(action.into()));
        Self { id: Some(Uuid::new_v4()), payload }
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The `action` tag, if present and a string.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.payload.get("action").and_then(Value::as_str)
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// Tagged response body. Exactly one field is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Response {
    #[must_use]
    pub fn explanation(text: impl Into<String>) -> Self {
        Self { explanation: Some(text.into()), ..Self::default() }
    }

    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self { response: Some(text.into()), ..Self::default() }
    }

    #[must_use]
    pub fn settings(settings: Settings) -> Self {
        Self { settings: Some(settings), ..Self::default() }
    }

    #[must_use]
    pub fn success(ok: bool) -> Self {
        Self { success: Some(ok), ..Self::default() }
    }

    /// Plain error string, no code.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { error: Some(message.into()), ..Self::default() }
    }

    /// Structured error from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self { error: Some(err.to_string()), code: Some(err.error_code().to_string()), ..Self::default() }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Response envelope. Inherits the request id as `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    pub ts: i64,
    #[serde(flatten)]
    pub body: Response,
}

impl Outbound {
    #[must_use]
    pub fn reply_to(parent_id: Option<Uuid>, body: Response) -> Self {
        Self { parent_id, ts: now_ms(), body }
    }
}

/// Server-pushed notification for connected surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    /// Ask the surface to open the configuration page.
    OpenOptions,
    /// Settings were saved; surfaces re-apply theme etc.
    SettingsChanged { settings: Settings },
    /// One progressive-render step for the reply to `parent_id`.
    #[serde(rename_all = "camelCase")]
    Render { parent_id: Option<Uuid>, html: String, done: bool },
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
