//! Player configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Position watcher interval while playing (milliseconds)
    pub position_interval_ms: u64,
    /// Buffer poll interval while the engine is loading (milliseconds)
    pub buffer_poll_interval_ms: u64,
    /// Ordered system language preference, lower-cased IETF tags
    pub system_languages: Vec<String>,
    /// Start playing as soon as the media is ready
    pub auto_play: bool,
    /// Emit `playing`, `speed` and `volume` events
    pub echo_playback_changes: bool,
    /// Directory bundled `asset://` sources resolve against
    pub asset_root: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            position_interval_ms: 10,
            buffer_poll_interval_ms: 100,
            system_languages: system_languages_from_env(),
            auto_play: false,
            echo_playback_changes: false,
            asset_root: None,
        }
    }
}

impl PlayerConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: PlayerConfig = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.system_languages = config
            .system_languages
            .iter()
            .map(|lang| lang.to_lowercase())
            .collect();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.position_interval_ms == 0 {
            return Err(Error::InvalidConfig("position_interval_ms must be non-zero".into()));
        }
        if self.buffer_poll_interval_ms == 0 {
            return Err(Error::InvalidConfig("buffer_poll_interval_ms must be non-zero".into()));
        }
        Ok(())
    }

    pub fn position_interval(&self) -> Duration {
        Duration::from_millis(self.position_interval_ms)
    }

    pub fn buffer_poll_interval(&self) -> Duration {
        Duration::from_millis(self.buffer_poll_interval_ms)
    }

    pub fn with_system_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.system_languages = languages
            .into_iter()
            .map(|lang| lang.as_ref().to_lowercase())
            .collect();
        self
    }
}

/// Ordered language preference from the POSIX locale environment.
///
/// `LANGUAGE` may hold a colon separated list; the other variables hold a
/// single locale. Duplicates and the `C`/`POSIX` locales are skipped.
pub fn system_languages_from_env() -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for var in ["LANGUAGE", "LC_ALL", "LC_MESSAGES", "LANG"] {
        let Ok(value) = std::env::var(var) else {
            continue;
        };
        for locale in value.split(':') {
            if let Some(tag) = locale_to_tag(locale) {
                if !languages.contains(&tag) {
                    languages.push(tag);
                }
            }
        }
    }
    languages
}

/// `en_US.UTF-8@euro` becomes `en-us`
pub fn locale_to_tag(locale: &str) -> Option<String> {
    let base = locale.split(['.', '@']).next().unwrap_or_default().trim();
    if base.is_empty() || base.eq_ignore_ascii_case("c") || base.eq_ignore_ascii_case("posix") {
        return None;
    }
    Some(base.replace('_', "-").to_lowercase())
}
