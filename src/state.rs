//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is built once at startup and injected into Axum handlers via
//! the `State` extractor. It owns the message router (and through it the
//! settings store, cache, limiter and API client), renderer pacing and the
//! browser origins allowed to reach the routes.

use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::config::{AppConfig, StreamConfig};
use crate::llm::{ApiClient, LlmChat};
use crate::rate_limit::RateLimiter;
use crate::router::MessageRouter;
use crate::settings::SettingsStore;

/// Shared application state. Clone is required by Axum; every field is
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub router: MessageRouter,
    pub stream: StreamConfig,
    pub allowed_origins: Arc<[String]>,
}

impl AppState {
    #[must_use]
    pub fn new(router: MessageRouter, stream: StreamConfig, allowed_origins: Vec<String>) -> Self {
        Self { router, stream, allowed_origins: allowed_origins.into() }
    }

    /// Whether a request carrying `Origin: origin` may be served.
    #[must_use]
    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }

    /// Wire components from configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig, settings: SettingsStore, llm: Arc<dyn LlmChat>) -> Self {
        let router = MessageRouter::new(
            settings,
            ResponseCache::new(config.cache_ttl),
            RateLimiter::new(config.rate_limit_min_delay),
            ApiClient::new(llm),
        );
        Self::new(router, config.stream, config.allowed_origins.clone())
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
