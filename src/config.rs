//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cybershield.toml` files, and collecting provider credentials from the
//! environment. Credentials are never read from (or written to) the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".cybershield.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Outbound HTTP settings shared by all providers.
    #[serde(default)]
    pub http: HttpConfig,

    /// Gemini primary provider.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// OpenAI primary provider.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// OpenRouter synthesizer.
    #[serde(default)]
    pub synthesizer: SynthesizerConfig,

    /// HTTP server settings (`serve` mode).
    #[serde(default)]
    pub server: ServerConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds. A timed-out call counts as a failed call.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

/// Gemini `generateContent` settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_url")]
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            base_url: default_gemini_url(),
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

/// OpenAI chat-completions settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_openai_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            base_url: default_openai_url(),
        }
    }
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com".to_string()
}

/// Synthesizer (OpenRouter) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    #[serde(default = "default_synthesizer_model")]
    pub model: String,

    #[serde(default = "default_openrouter_url")]
    pub base_url: String,

    /// Temperature for the reconciliation call.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            model: default_synthesizer_model(),
            base_url: default_openrouter_url(),
            temperature: default_temperature(),
        }
    }
}

fn default_synthesizer_model() -> String {
    "anthropic/claude-3.5-sonnet".to_string()
}

fn default_openrouter_url() -> String {
    "https://openrouter.ai".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log file tailed by the admin log endpoint. Empty disables file logging.
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

fn default_log_file() -> String {
    "cybershield.log".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only explicitly provided CLI values override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(timeout) = args.timeout {
            self.http.timeout_seconds = timeout;
        }
        if let Some(ref bind) = args.bind {
            self.server.bind = bind.clone();
        }
        if let Some(ref log_file) = args.log_file {
            self.logging.file = log_file.clone();
        }
    }

    /// Log file path, or `None` when file logging is disabled.
    pub fn log_file(&self) -> Option<&Path> {
        let file = self.logging.file.trim();
        if file.is_empty() {
            None
        } else {
            Some(Path::new(file))
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Provider name for the Gemini primary provider.
pub const GEMINI: &str = "gemini";
/// Provider name for the OpenAI primary provider.
pub const OPENAI: &str = "openai";
/// Provider name for the OpenRouter synthesizer.
pub const OPENROUTER: &str = "openrouter";

/// Recognized credentials and the environment variable each is read from.
pub const CREDENTIAL_VARS: [(&str, &str); 3] = [
    (GEMINI, "GOOGLE_API_KEY"),
    (OPENAI, "OPENAI_API_KEY"),
    (OPENROUTER, "OPENROUTER_API_KEY"),
];

/// API keys keyed by provider name.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: HashMap<String, String>,
}

impl Credentials {
    /// Read every recognized credential from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read recognized credentials through `lookup`, skipping blank values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let keys = CREDENTIAL_VARS
            .iter()
            .filter_map(|(provider, var)| {
                lookup(var)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(|v| (provider.to_string(), v))
            })
            .collect();
        Self { keys }
    }

    /// Add or replace a credential.
    #[allow(dead_code)] // Builder for embedding without environment variables
    pub fn with(mut self, provider: &str, key: impl Into<String>) -> Self {
        self.keys.insert(provider.to_string(), key.into());
        self
    }

    /// Credential for `provider`, if one was supplied.
    pub fn get(&self, provider: &str) -> Option<&str> {
        self.keys.get(provider).map(String::as_str)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Credentials")
            .field("providers", &names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gemini.model, "gemini-1.5-flash-latest");
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.synthesizer.model, "anthropic/claude-3.5-sonnet");
        assert_eq!(config.http.timeout_seconds, 60);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.log_file(), Some(Path::new("cybershield.log")));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[http]
timeout_seconds = 15

[openai]
model = "gpt-4o-mini"

[synthesizer]
base_url = "http://localhost:9000"
temperature = 0.0

[logging]
file = ""
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.http.timeout_seconds, 15);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.base_url, "https://api.openai.com");
        assert_eq!(config.synthesizer.base_url, "http://localhost:9000");
        assert_eq!(config.synthesizer.temperature, 0.0);
        assert_eq!(config.gemini.model, "gemini-1.5-flash-latest");
        assert!(config.log_file().is_none());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[gemini]"));
        assert!(toml_str.contains("[synthesizer]"));
        assert!(!toml_str.contains("API_KEY"));
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = Credentials::from_lookup(|var| match var {
            "GOOGLE_API_KEY" => Some("g-key".to_string()),
            "OPENAI_API_KEY" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(creds.get(GEMINI), Some("g-key"));
        assert_eq!(creds.get(OPENAI), None);
        assert_eq!(creds.get(OPENROUTER), None);
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = Credentials::default().with(OPENROUTER, "sk-or-secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("openrouter"));
        assert!(!debug.contains("sk-or-secret"));
    }
}
