// Configuration for the study system

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Config file looked up in the working directory, then the home directory
pub const CONFIG_FILE_NAME: &str = ".daily-sentence.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Base URL of the translation service
    #[serde(default = "default_translation_endpoint")]
    pub translation_endpoint: String,

    /// Base URL of the generative-language API (without the model path)
    #[serde(default = "default_generative_endpoint")]
    pub generative_endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Generative-language API key; tips are disabled without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Total attempts for a rate-limited tip request
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Fixed delay before retrying a rate-limited tip request
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Where the last session is persisted
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,

    /// Text-to-speech program; `{locale}` in its arguments is substituted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_command: Option<Vec<String>>,
}

fn default_translation_endpoint() -> String {
    "https://api.mymemory.translated.net".to_string()
}

fn default_generative_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_retry_max_attempts() -> u32 {
    2
}

fn default_retry_backoff() -> u64 {
    2000
}

fn default_session_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("daily-sentence").join("session.json"))
        .unwrap_or_else(|| PathBuf::from(".daily-sentence-session.json"))
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            translation_endpoint: default_translation_endpoint(),
            generative_endpoint: default_generative_endpoint(),
            model: default_model(),
            api_key: None,
            request_timeout_ms: default_request_timeout(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            session_path: default_session_path(),
            speech_command: None,
        }
    }
}

impl StudyConfig {
    /// Load from an explicit path, or from the first config file found.
    /// Environment overrides are applied on top.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit.map(Path::to_path_buf).or_else(find_config) {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("no {} found, using defaults", CONFIG_FILE_NAME);
                Self::default()
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(path = %path.display(), "loading config");
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Write this config as pretty JSON
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, json).map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))
    }

    /// `GEMINI_API_KEY` and `GEMINI_MODEL` override file values
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("GEMINI_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
    }

    /// API key, if one is set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn find_config() -> Option<PathBuf> {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return Some(local_config);
    }

    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
