//! Message router — one response per UI request.
//!
//! DESIGN
//! ======
//! UI surfaces send tagged envelopes (`explain`, `followUp`, `getSettings`,
//! `saveSettings`, `openOptions`, `testConnection`). The router validates
//! the payload, consults the cache, paces API calls through the limiter,
//! and always answers with exactly one [`Outbound`]: a result field or an
//! error string.
//!
//! ERROR HANDLING
//! ==============
//! Handler errors become `{error, code}` responses; nothing is thrown across
//! the message boundary. [`MessageRouter::dispatch_isolated`] runs each
//! request in its own task so a panic in one handler is reported as an
//! internal error and later requests are still served.

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::cache::ResponseCache;
use crate::envelope::{ErrorCode, Event, Inbound, Outbound, Response};
use crate::llm::ApiClient;
use crate::llm::types::{ConversationTurn, LlmError};
use crate::rate_limit::RateLimiter;
use crate::settings::{Settings, SettingsError, SettingsStore};

const EVENT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("{0}")]
    Validation(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("internal error")]
    Internal,
}

impl ErrorCode for RouterError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::UnknownAction(_) => "E_UNKNOWN_ACTION",
            Self::Llm(e) => e.error_code(),
            Self::Settings(e) => e.error_code(),
            Self::Internal => "E_INTERNAL",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.retryable(),
            Self::Settings(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Explain { text: String, settings: Settings },
    FollowUp { history: Vec<ConversationTurn>, question: String, settings: Settings },
    GetSettings,
    SaveSettings { settings: Settings },
    OpenOptions,
    TestConnection { api_key: String },
}

impl Request {
    /// Validate an inbound envelope into a typed request.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnknownAction`] for a missing or unrecognized
    /// tag and [`RouterError::Validation`] for missing required fields.
    pub fn parse(inbound: &Inbound) -> Result<Self, RouterError> {
        let data = &inbound.payload;
        match inbound.action().unwrap_or_default() {
            "explain" => {
                let text = required_text(data, "text")?;
                let settings = required_settings(data)?;
                Ok(Self::Explain { text, settings })
            }
            "followUp" => {
                let question = required_text(data, "question")?;
                let settings = required_settings(data)?;
                let history = match data.get("history") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(raw) => serde_json::from_value(raw.clone())
                        .map_err(|e| RouterError::Validation(format!("history is invalid: {e}")))?,
                };
                Ok(Self::FollowUp { history, question, settings })
            }
            "getSettings" => Ok(Self::GetSettings),
            "saveSettings" => {
                let settings = data
                    .get("settings")
                    .cloned()
                    .ok_or_else(|| RouterError::Validation("settings are required".into()))?;
                let settings = serde_json::from_value(settings)
                    .map_err(|e| RouterError::Validation(format!("settings are invalid: {e}")))?;
                Ok(Self::SaveSettings { settings })
            }
            "openOptions" => Ok(Self::OpenOptions),
            "testConnection" => {
                let api_key = required_text(data, "apiKey")
                    .map_err(|_| RouterError::Validation("Please enter an API key".into()))?;
                Ok(Self::TestConnection { api_key: api_key.trim().to_string() })
            }
            "" => Err(RouterError::UnknownAction("(none)".into())),
            other => Err(RouterError::UnknownAction(other.to_string())),
        }
    }

    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Explain { .. } => "explain",
            Self::FollowUp { .. } => "followUp",
            Self::GetSettings => "getSettings",
            Self::SaveSettings { .. } => "saveSettings",
            Self::OpenOptions => "openOptions",
            Self::TestConnection { .. } => "testConnection",
        }
    }

    /// Encode as an inbound envelope with a fresh id. Used by UI models.
    #[must_use]
    pub fn to_inbound(&self) -> Inbound {
        let inbound = Inbound::new(self.action());
        match self {
            Self::Explain { text, settings } => inbound
                .with_data("text", text.as_str())
                .with_data("settings", settings_value(settings)),
            Self::FollowUp { history, question, settings } => inbound
                .with_data("history", serde_json::to_value(history).unwrap_or_default())
                .with_data("question", question.as_str())
                .with_data("settings", settings_value(settings)),
            Self::SaveSettings { settings } => inbound.with_data("settings", settings_value(settings)),
            Self::TestConnection { api_key } => inbound.with_data("apiKey", api_key.as_str()),
            Self::GetSettings | Self::OpenOptions => inbound,
        }
    }
}

fn settings_value(settings: &Settings) -> Value {
    serde_json::to_value(settings).unwrap_or_default()
}

fn required_text(data: &serde_json::Map<String, Value>, key: &str) -> Result<String, RouterError> {
    match data.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(RouterError::Validation(format!("{key} is required"))),
    }
}

/// Settings carried by `explain` / `followUp`; the API key must be set.
fn required_settings(data: &serde_json::Map<String, Value>) -> Result<Settings, RouterError> {
    let Some(raw) = data.get("settings").filter(|v| !v.is_null()) else {
        return Err(RouterError::Validation("settings are required".into()));
    };
    let settings: Settings = serde_json::from_value(raw.clone())
        .map_err(|e| RouterError::Validation(format!("settings are invalid: {e}")))?;
    if !settings.has_api_key() {
        return Err(RouterError::Validation(
            "Please set your API key in the extension options".into(),
        ));
    }
    Ok(settings)
}

// =============================================================================
// ROUTER
// =============================================================================

#[derive(Clone)]
pub struct MessageRouter {
    settings: SettingsStore,
    cache: ResponseCache,
    limiter: RateLimiter,
    api: ApiClient,
    events: broadcast::Sender<Event>,
}

impl MessageRouter {
    #[must_use]
    pub fn new(settings: SettingsStore, cache: ResponseCache, limiter: RateLimiter, api: ApiClient) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { settings, cache, limiter, api, events }
    }

    #[must_use]
    pub fn settings_store(&self) -> &SettingsStore {
        &self.settings
    }

    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Subscribe to server-pushed UI events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Parse and handle one envelope. Always returns a response envelope.
    pub async fn dispatch(&self, inbound: Inbound) -> Outbound {
        let parent_id = inbound.id;
        let result = match Request::parse(&inbound) {
            Ok(request) => {
                info!(id = ?parent_id, action = request.action(), "router: dispatch");
                self.handle(request).await
            }
            Err(e) => Err(e),
        };
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                warn!(id = ?parent_id, code = e.error_code(), error = %e, "router: request failed");
                Response::error_from(&e)
            }
        };
        Outbound::reply_to(parent_id, body)
    }

    /// Like [`dispatch`](Self::dispatch), but in a separate task so a panic
    /// inside a handler still yields a response.
    pub async fn dispatch_isolated(&self, inbound: Inbound) -> Outbound {
        let parent_id = inbound.id;
        let router = self.clone();
        match tokio::spawn(async move { router.dispatch(inbound).await }).await {
            Ok(outbound) => outbound,
            Err(e) => {
                error!(id = ?parent_id, error = %e, "router: handler task failed");
                Outbound::reply_to(parent_id, Response::error_from(&RouterError::Internal))
            }
        }
    }

    /// Handle a validated request.
    ///
    /// # Errors
    ///
    /// Returns a [`RouterError`] for API and storage failures.
    pub async fn handle(&self, request: Request) -> Result<Response, RouterError> {
        match request {
            Request::Explain { text, settings } => self.explain(&text, &settings).await,
            Request::FollowUp { history, question, settings } => {
                let waited = self.limiter.acquire().await;
                info!(waited = ?waited, "router: follow-up dispatched");
                let reply = self
                    .api
                    .follow_up(&history, &question, &settings)
                    .await?;
                Ok(Response::reply(reply))
            }
            Request::GetSettings => Ok(Response::settings(self.settings.get_or_default().await)),
            Request::SaveSettings { settings } => {
                self.settings.save(settings).await?;
                Ok(Response::success(true))
            }
            Request::OpenOptions => {
                let delivered = self.events.send(Event::OpenOptions).is_ok();
                if !delivered {
                    warn!("router: openOptions with no surface listening");
                }
                Ok(Response::success(delivered))
            }
            Request::TestConnection { api_key } => {
                self.api.test_connection(&api_key).await?;
                Ok(Response::success(true))
            }
        }
    }

    async fn explain(&self, text: &str, settings: &Settings) -> Result<Response, RouterError> {
        if let Some(hit) = self.cache.get(text, &settings.model) {
            info!(model = %settings.model, "router: cache hit");
            return Ok(Response::explanation(hit));
        }

        let waited = self.limiter.acquire().await;
        info!(waited = ?waited, model = %settings.model, "router: cache miss, calling API");
        let explanation = self.api.explain(text, settings).await?;
        self.cache.put(text, &settings.model, explanation.clone());
        Ok(Response::explanation(explanation))
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
