use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::language::Language;

/// DeepL free-tier translate endpoint
pub const DEEPL_FREE_URL: &str = "https://api-free.deepl.com/v2/translate";
/// Authorization scheme DeepL expects in front of the key
pub const DEEPL_AUTH_SCHEME: &str = "DeepL-Auth-Key";
pub const DEFAULT_RUNNER_COMMAND: &str = "ollama";
pub const DEFAULT_MODEL: &str = "deepseek-ai/deepseek-llm";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration, loadable from TOML.
///
/// Every section falls back to its defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub translator: TranslatorConfig,
    pub runner: RunnerConfig,
    pub chat: ChatSettings,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// DeepL credential; empty means translation is unavailable
    pub api_key: String,
    pub endpoint: String,
    pub auth_scheme: String,
    /// Request timeout; the HTTP client default applies when unset
    pub timeout_secs: Option<u64>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEEPL_FREE_URL.to_string(),
            auth_scheme: DEEPL_AUTH_SCHEME.to_string(),
            timeout_secs: None,
        }
    }
}

impl TranslatorConfig {
    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

// Keeps the key out of logs and panics.
impl fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("api_key", &if self.has_credential() { "<set>" } else { "<missing>" })
            .field("endpoint", &self.endpoint)
            .field("auth_scheme", &self.auth_scheme)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Executable launched as `<command> run <model> <prompt>`
    pub command: String,
    pub model: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_RUNNER_COMMAND.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Which text the user half of an exchange shows when translation is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserTurnDisplay {
    /// The prompt as sent to the model (English pipeline text)
    #[default]
    Translated,
    /// The prompt exactly as the user typed it
    Original,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub user_label: String,
    pub assistant_label: String,
    pub user_turn: UserTurnDisplay,
    pub default_language: Language,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            user_label: "User".to_string(),
            assistant_label: "Deepseek".to_string(),
            user_turn: UserTurnDisplay::default(),
            default_language: Language::default(),
        }
    }
}

impl ChatConfig {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Overlay values from environment-style variables.
    ///
    /// `lookup` is usually `std::env::var(..).ok()`; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("DEEPL_API_KEY") {
            self.translator.api_key = key;
        }
        if let Some(url) = get("KOCHAT_DEEPL_URL") {
            self.translator.endpoint = url;
        }
        if let Some(command) = get("KOCHAT_RUNNER") {
            self.runner.command = command;
        }
        if let Some(model) = get("KOCHAT_MODEL") {
            self.runner.model = model;
        }
        if let Some(language) = get("KOCHAT_LANGUAGE") {
            self.chat.default_language = Language::parse_lossy(&language);
        }
    }
}
