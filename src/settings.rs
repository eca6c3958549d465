//! Sync configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for paging and debouncing.
///
/// Settings are stored as JSON; missing fields fall back to the defaults.
///
/// # Example
/// ```rust,no_run
/// use skylight_sync::settings::Settings;
///
/// let mut settings = Settings::load("sync.json").expect("Failed to load");
/// settings.conversation_page_limit = 20;
/// settings.save("sync.json").expect("Failed to save");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Conversations per page
    pub conversation_page_limit: u32,
    /// Messages per history page
    pub message_page_limit: u32,
    /// Feed posts per page
    pub feed_page_limit: u32,
    /// Quiescence window for end-of-list triggers, in milliseconds
    pub fetch_debounce_ms: u64,
    /// Quiescence window for search input, in milliseconds
    pub search_debounce_ms: u64,
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// # Returns
    /// The loaded settings, or defaults if the file doesn't exist or is empty
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Self = serde_json::from_str(&data)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a JSON file, creating the parent directory
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject page limits of zero
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("conversation_page_limit", self.conversation_page_limit),
            ("message_page_limit", self.message_page_limit),
            ("feed_page_limit", self.feed_page_limit),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }
        Ok(())
    }

    /// Debounce window for end-of-list triggers
    pub fn fetch_debounce(&self) -> Duration {
        Duration::from_millis(self.fetch_debounce_ms)
    }

    /// Debounce window for search input
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            conversation_page_limit: 12,
            message_page_limit: 20,
            feed_page_limit: 12,
            fetch_debounce_ms: 1000,
            search_debounce_ms: 400,
        }
    }
}
