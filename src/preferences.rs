//! User preferences: display language and the two feature toggles the scan
//! pipeline honours.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub language: Language,
    #[serde(default = "enabled")]
    pub highlight_enabled: bool,
    #[serde(default = "enabled")]
    pub auto_popup_enabled: bool,
}

fn enabled() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: Language::En,
            highlight_enabled: true,
            auto_popup_enabled: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("preference store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid preference file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("preference store lock poisoned")]
    Poisoned,
}

pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<Preferences, PreferenceError>;
    fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError>;
}

/// Load preferences, falling back to defaults if the store is unreadable.
pub fn load_or_default(store: &dyn PreferenceStore) -> Preferences {
    store.load().unwrap_or_else(|e| {
        log::warn!("Failed to load preferences, using defaults: {}", e);
        Preferences::default()
    })
}

/// [`load_or_default`] on the blocking thread pool, so file-backed stores
/// never stall an async task.
pub async fn load_in_background(store: Arc<dyn PreferenceStore>) -> Preferences {
    match tokio::task::spawn_blocking(move || load_or_default(store.as_ref())).await {
        Ok(preferences) => preferences,
        Err(e) => {
            log::warn!("Preference load task failed, using defaults: {}", e);
            Preferences::default()
        }
    }
}

/// YAML file store. A missing file reads as the defaults.
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Preferences, PreferenceError> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_yaml::to_string(preferences)?)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPreferenceStore {
    preferences: RwLock<Preferences>,
}

impl MemoryPreferenceStore {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            preferences: RwLock::new(preferences),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Preferences, PreferenceError> {
        self.preferences
            .read()
            .map(|p| p.clone())
            .map_err(|_| PreferenceError::Poisoned)
    }

    fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError> {
        let mut guard = self
            .preferences
            .write()
            .map_err(|_| PreferenceError::Poisoned)?;
        *guard = preferences.clone();
        Ok(())
    }
}
