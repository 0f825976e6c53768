//! User preferences for console sessions.
//!
//! Stored as pretty-printed JSON under the user config directory. A
//! missing or unreadable file falls back to defaults; nothing here is
//! fatal.

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::history::FileHistorySink;

/// Preferences consumed by the close policy and the history sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Ask before a close that would take the kernel and its other
    /// sessions down with it.
    pub confirm_on_close: bool,
    /// File the history sink appends executed commands to.
    pub history_file: PathBuf,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            confirm_on_close: true,
            history_file: FileHistorySink::default_path(),
        }
    }
}

/// Path of the settings file under the user config directory.
pub fn settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kernel-console")
        .join("settings.json")
}

impl ConsoleSettings {
    /// Load settings from `path`, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                warn!("[settings] failed to read {}: {err}", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("[settings] failed to parse {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Write settings to `path` as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, format!("{json}\n"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ConsoleSettings::default();
        assert!(settings.confirm_on_close);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let settings = ConsoleSettings {
            confirm_on_close: false,
            history_file: PathBuf::from("/tmp/h.py"),
        };
        settings.save(&path).unwrap();

        let loaded = ConsoleSettings::load(&path);
        assert!(!loaded.confirm_on_close);
        assert_eq!(loaded.history_file, PathBuf::from("/tmp/h.py"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let loaded = ConsoleSettings::load(&dir.path().join("nope.json"));
        assert!(loaded.confirm_on_close);
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let loaded = ConsoleSettings::load(&path);
        assert!(loaded.confirm_on_close);
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"confirm_on_close": false, "someday": 1}"#).unwrap();
        let loaded = ConsoleSettings::load(&path);
        assert!(!loaded.confirm_on_close);
    }
}
