//! Settings store — persistent user configuration with defaults.
//!
//! DESIGN
//! ======
//! `Settings` is read through [`SettingsStore::get`], which fills any missing
//! field with its default, and written through [`SettingsStore::save`],
//! which validates, persists, and notifies subscribers over a `watch`
//! channel. The storage medium sits behind [`SettingsBackend`]: a JSON file
//! in production, an in-memory slot in tests.
//!
//! ERROR HANDLING
//! ==============
//! Read failures surface as [`SettingsError`]; callers that answer UI
//! requests degrade to defaults via [`SettingsStore::get_or_default`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::envelope::ErrorCode;

pub const DEFAULT_MODEL: &str = "anthropic/claude-3-sonnet";
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "Please explain the selected text in a clear and concise manner.";

// =============================================================================
// SETTINGS
// =============================================================================

/// User settings as persisted and exchanged with UI surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub system_instructions: String,
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
            dark_mode: false,
        }
    }
}

impl Settings {
    /// Trim free-text fields the way the options form does before saving.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.api_key = self.api_key.trim().to_string();
        self.system_instructions = self.system_instructions.trim().to_string();
        self
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings are corrupt: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("API Key is required")]
    MissingApiKey,
}

impl ErrorCode for SettingsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "E_SETTINGS_IO",
            Self::Parse(_) => "E_SETTINGS_PARSE",
            Self::MissingApiKey => "E_MISSING_API_KEY",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

// =============================================================================
// BACKENDS
// =============================================================================

/// Raw key-value storage for the serialized settings document.
#[async_trait::async_trait]
pub trait SettingsBackend: Send + Sync {
    /// Load the stored document, `None` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    async fn load(&self) -> Result<Option<String>, SettingsError>;

    /// Replace the stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be written.
    async fn store(&self, raw: &str) -> Result<(), SettingsError>;
}

/// JSON file on disk. Writes go to a sibling temp file and are renamed into
/// place so a crash never leaves a half-written document.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl SettingsBackend for FileBackend {
    async fn load(&self) -> Result<Option<String>, SettingsError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, raw: &str) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Process-local slot. Used by tests and when no settings path is wanted.
#[derive(Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<String>>,
}

#[async_trait::async_trait]
impl SettingsBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<String>, SettingsError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    async fn store(&self, raw: &str) -> Result<(), SettingsError> {
        *self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(raw.to_string());
        Ok(())
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Settings store shared by the router and the transport layer.
#[derive(Clone)]
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    changes: Arc<watch::Sender<Settings>>,
}

impl SettingsStore {
    #[must_use]
    pub fn new(backend: Arc<dyn SettingsBackend>) -> Self {
        let (changes, _) = watch::channel(Settings::default());
        Self { backend, changes: Arc::new(changes) }
    }

    /// In-memory store, empty until the first save.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::default()))
    }

    /// Read settings, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or holds invalid JSON.
    pub async fn get(&self) -> Result<Settings, SettingsError> {
        let Some(raw) = self.backend.load().await? else {
            return Ok(Settings::default());
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Read settings, degrading to defaults on any storage failure.
    pub async fn get_or_default(&self) -> Settings {
        match self.get().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "settings: read failed, using defaults");
                Settings::default()
            }
        }
    }

    /// Validate, persist, and broadcast new settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingApiKey`] when the key is blank, or a
    /// storage error if the write fails.
    pub async fn save(&self, settings: Settings) -> Result<Settings, SettingsError> {
        let settings = settings.normalized();
        if !settings.has_api_key() {
            return Err(SettingsError::MissingApiKey);
        }
        let raw = serde_json::to_string_pretty(&settings)?;
        self.backend.store(&raw).await?;
        info!(model = %settings.model, dark_mode = settings.dark_mode, "settings: saved");
        self.changes.send_replace(settings.clone());
        Ok(settings)
    }

    /// Subscribe to saved-settings notifications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
