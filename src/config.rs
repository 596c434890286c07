//! Process configuration parsed from environment variables.
//!
//! Every knob has a default, so a bare `explain-it` invocation starts a
//! usable service. `main` loads `.env` first, so the same variables can live
//! in a dotenv file during development.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::llm::config::LlmConfig;

pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SETTINGS_PATH: &str = "explain-it-settings.json";
pub const DEFAULT_CACHE_TTL_MS: u64 = 300_000;
pub const DEFAULT_RATE_LIMIT_MIN_DELAY_MS: u64 = 1000;
pub const DEFAULT_STREAM_CHUNK_CHARS: usize = 3;
pub const DEFAULT_STREAM_FRAME_MS: u64 = 10;

/// Parse `key` from the environment, falling back to `default` when the
/// variable is unset or malformed.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Split a comma-separated origin list, dropping blanks and trailing `/`.
#[must_use]
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Pacing knobs for the streaming renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub chunk_chars: usize,
    pub frame_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { chunk_chars: DEFAULT_STREAM_CHUNK_CHARS, frame_interval: Duration::from_millis(DEFAULT_STREAM_FRAME_MS) }
    }
}

impl StreamConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            chunk_chars: env_parse("STREAM_CHUNK_CHARS", DEFAULT_STREAM_CHUNK_CHARS).max(1),
            frame_interval: Duration::from_millis(env_parse("STREAM_FRAME_MS", DEFAULT_STREAM_FRAME_MS)),
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub settings_path: PathBuf,
    pub cache_ttl: Duration,
    pub rate_limit_min_delay: Duration,
    pub stream: StreamConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    /// Build config from environment variables.
    ///
    /// - `HOST`: listen address (default 127.0.0.1)
    /// - `PORT`: listen port (default 3000)
    /// - `CORS_ALLOW_ORIGIN`: comma-separated browser origins allowed to call
    ///   the service, e.g. `chrome-extension://<id>` (default none)
    /// - `SETTINGS_PATH`: JSON settings file (default `explain-it-settings.json`)
    /// - `CACHE_TTL_MS`: response cache time-to-live (default 300000)
    /// - `RATE_LIMIT_MIN_DELAY_MS`: minimum gap between API calls (default 1000)
    /// - `STREAM_CHUNK_CHARS` / `STREAM_FRAME_MS`: renderer pacing (default 3 / 10)
    /// - `LLM_*`: see [`LlmConfig::from_env`]
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            host: env_parse("HOST", DEFAULT_HOST),
            port: env_parse("PORT", DEFAULT_PORT),
            allowed_origins: std::env::var("CORS_ALLOW_ORIGIN")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
            settings_path: std::env::var("SETTINGS_PATH")
                .map_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_PATH), PathBuf::from),
            cache_ttl: Duration::from_millis(env_parse("CACHE_TTL_MS", DEFAULT_CACHE_TTL_MS)),
            rate_limit_min_delay: Duration::from_millis(env_parse(
                "RATE_LIMIT_MIN_DELAY_MS",
                DEFAULT_RATE_LIMIT_MIN_DELAY_MS,
            )),
            stream: StreamConfig::from_env(),
            llm: LlmConfig::from_env(),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
