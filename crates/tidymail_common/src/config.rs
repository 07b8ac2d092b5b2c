//! Configuration loading.
//!
//! Reads config.json (path overridable via CONFIG_PATH); a missing or
//! invalid file falls back to defaults so the tool always starts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm::LlmConfig;

/// Default config file path, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Environment variable overriding the config file path
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Top-level configuration surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Keyword rules: label -> keyword list (non-AI strategy)
    #[serde(default)]
    pub rules: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub llm: LlmConfig,
}

/// Mailbox processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// How many messages to fetch from the mailbox per run
    #[serde(default = "default_max_emails")]
    pub max_emails_to_process: usize,

    /// Whether message bodies are fetched at all
    #[serde(default = "default_check_body")]
    pub check_body: bool,

    /// Body truncation length in bytes
    #[serde(default = "default_body_extract_length")]
    pub body_extract_length: usize,

    /// Category store file path
    #[serde(default = "default_categories_file")]
    pub categories_file: String,
}

fn default_max_emails() -> usize {
    50
}

fn default_check_body() -> bool {
    true
}

fn default_body_extract_length() -> usize {
    1000
}

fn default_categories_file() -> String {
    "categories.json".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_emails_to_process: default_max_emails(),
            check_body: default_check_body(),
            body_extract_length: default_body_extract_length(),
            categories_file: default_categories_file(),
        }
    }
}

impl Config {
    /// Load configuration from the default path or the CONFIG_PATH override.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load configuration from an explicit path, defaulting on any failure.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Invalid config file {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("Config file {} not found - using defaults", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.rules.is_empty());
        assert_eq!(config.settings.max_emails_to_process, 50);
        assert!(config.settings.check_body);
        assert_eq!(config.settings.body_extract_length, 1000);
        assert_eq!(config.settings.categories_file, "categories.json");
        assert!(config.llm.enabled);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json"));
        assert_eq!(config.settings.max_emails_to_process, 50);
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ broken").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.settings.body_extract_length, 1000);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"settings": {"max_emails_to_process": 10}, "rules": {"Work": ["meeting"]}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.settings.max_emails_to_process, 10);
        assert!(config.settings.check_body);
        assert_eq!(config.rules["Work"], vec!["meeting".to_string()]);
        assert!(config.llm.enabled);
    }

    #[test]
    fn test_llm_section_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"llm": {"enabled": false, "model": "llama3.2:3b"}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert!(!config.llm.enabled);
        assert_eq!(config.llm.model, "llama3.2:3b");
        assert_eq!(config.llm.timeout_secs, 120);
    }
}
