use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

/// Placeholder value some setup guides leave behind; treated as unset.
const API_KEY_PLACEHOLDER: &str = "your_api_key_here";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API key. The GEMINI_API_KEY environment variable takes
    /// precedence over this value.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub generation: GenerationConfig,

    /// How many trailing messages are sent as conversation context.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Hard cap on the prompt input length, in characters.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    #[serde(default = "default_theme_name")]
    pub theme: String,
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_history_window() -> usize {
    10
}

fn default_max_input_chars() -> usize {
    2000
}

fn default_theme_name() -> String {
    "dark".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            generation: GenerationConfig::default(),
            history_window: default_history_window(),
            max_input_chars: default_max_input_chars(),
            theme: default_theme_name(),
        }
    }
}

/// Generation parameters forwarded to the API on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_k() -> u32 {
    40
}

fn default_top_p() -> f64 {
    0.95
}

fn default_max_output_tokens() -> u32 {
    2048
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `path` is None. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Default config file location (~/.config/parley/config.json on Linux).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
            .join("config.json")
    }

    /// Resolve the API key: environment variable first, then the config
    /// file. The well-known placeholder value counts as unset.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV_VAR)
            .ok()
            .or_else(|| self.api_key.clone())
            .filter(|k| !k.is_empty() && k != API_KEY_PLACEHOLDER)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-2.0-flash-exp");
        assert_eq!(config.history_window, 10);
        assert_eq!(config.max_input_chars, 2000);
        assert_eq!(config.theme, "dark");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_default_generation_parameters() {
        let generation = GenerationConfig::default();
        assert_eq!(generation.temperature, 0.7);
        assert_eq!(generation.top_k, 40);
        assert_eq!(generation.top_p, 0.95);
        assert_eq!(generation.max_output_tokens, 2048);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"model": "gemini-1.5-pro", "history_window": 4}}"#).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.history_window, 4);
        // Everything not in the file keeps its default
        assert_eq!(config.max_input_chars, 2000);
        assert_eq!(config.generation.top_k, 40);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.json"))).unwrap();
        assert_eq!(config.model, default_model());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_placeholder_api_key_counts_as_unset() {
        let config = Config {
            api_key: Some("your_api_key_here".to_string()),
            ..Config::default()
        };
        // Only meaningful when the env var is not set in the test runner
        if std::env::var(API_KEY_ENV_VAR).is_err() {
            assert_eq!(config.resolved_api_key(), None);
        }
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model, config.model);
        assert_eq!(back.generation.max_output_tokens, 2048);
    }
}
