//! TOML Configuration File Support
//!
//! Centralized configuration loading for the chat client, from a TOML file at
//! `~/.config/twinchat/client.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! base_url = "http://127.0.0.1:8787"
//! request_timeout_ms = 15000
//! api_token = "dev-token"
//!
//! [typewriter]
//! rate_ms = 30
//!
//! [chat]
//! default_agent = "twin-assistant"
//! max_input_length = 8000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::DEFAULT_RATE;
use crate::messages::AgentId;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Base URL of the conversation backend
    pub base_url: Option<String>,

    /// Request timeout in milliseconds
    pub request_timeout_ms: Option<u64>,

    /// Bearer token sent with every request
    pub api_token: Option<String>,
}

/// Typewriter section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypewriterToml {
    /// Reveal rate in milliseconds per character
    pub rate_ms: Option<u64>,
}

/// Chat section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Agent addressed when none is given on the command line
    pub default_agent: Option<String>,

    /// Maximum message length in characters
    pub max_input_length: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Backend configuration section
    pub backend: BackendToml,

    /// Typewriter configuration section
    pub typewriter: TypewriterToml,

    /// Chat configuration section
    pub chat: ChatToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved backend settings
#[derive(Clone, Debug)]
pub struct BackendSettings {
    /// Base URL of the conversation backend
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Bearer token, if any
    pub api_token: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787".to_string(),
            request_timeout: Duration::from_secs(15),
            api_token: None,
        }
    }
}

/// Centralized configuration for the chat client
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend connection
    pub backend: BackendSettings,

    /// Typewriter reveal rate (per character)
    pub typewriter_rate: Duration,

    /// Agent addressed by sends
    pub default_agent: Option<AgentId>,

    /// Maximum message length in characters
    pub max_input_length: usize,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            typewriter_rate: DEFAULT_RATE,
            default_agent: None,
            max_input_length: 8000,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check invariants the rest of the client relies on
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a zero reveal rate, a zero
    /// request timeout, a zero input limit or an empty base URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.typewriter_rate.is_zero() {
            return Err(ConfigError::ValidationError(
                "typewriter rate must be greater than 0 ms".to_string(),
            ));
        }
        if self.backend.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "backend request timeout must be greater than 0 ms".to_string(),
            ));
        }
        if self.max_input_length == 0 {
            return Err(ConfigError::ValidationError(
                "max_input_length must be greater than 0".to_string(),
            ));
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/twinchat/client.toml` or
/// `~/.config/twinchat/client.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("twinchat").join("client.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or the
/// merged result fails validation. A missing config file is not an error.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration using a custom environment lookup
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or the result fails validation.
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // Start with defaults
    let mut config = ClientConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ClientToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    // Environment overrides file values
    apply_env_config(&mut config, env);

    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ClientConfig, toml: &ClientToml) {
    // Backend settings
    if let Some(ref url) = toml.backend.base_url {
        config.backend.base_url = url.clone();
    }
    if let Some(timeout) = toml.backend.request_timeout_ms {
        config.backend.request_timeout = Duration::from_millis(timeout);
    }
    if toml.backend.api_token.is_some() {
        config.backend.api_token = toml.backend.api_token.clone();
    }

    // Typewriter settings
    if let Some(rate) = toml.typewriter.rate_ms {
        config.typewriter_rate = Duration::from_millis(rate);
    }

    // Chat settings
    if let Some(ref agent) = toml.chat.default_agent {
        config.default_agent = Some(AgentId::new(agent.clone()));
    }
    if let Some(length) = toml.chat.max_input_length {
        config.max_input_length = length;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut ClientConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env("TWINCHAT_BASE_URL") {
        config.backend.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env("TWINCHAT_TIMEOUT_MS") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.backend.request_timeout = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(token) = env("TWINCHAT_API_TOKEN") {
        config.backend.api_token = Some(token);
        config.source = ConfigSource::Env;
    }
    if let Some(rate) = env("TWINCHAT_TYPEWRITER_RATE_MS") {
        if let Ok(ms) = rate.parse::<u64>() {
            config.typewriter_rate = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(agent) = env("TWINCHAT_AGENT") {
        config.default_agent = Some(AgentId::new(agent));
        config.source = ConfigSource::Env;
    }
    if let Some(max) = env("TWINCHAT_MAX_INPUT") {
        if let Ok(n) = max.parse::<usize>() {
            config.max_input_length = n;
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Command-line overrides, applied last
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend base URL override
    pub base_url: Option<String>,

    /// Typewriter rate override in milliseconds
    pub typewriter_rate_ms: Option<u64>,

    /// Agent override
    pub agent: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set typewriter rate override
    #[must_use]
    pub fn with_typewriter_rate_ms(mut self, ms: u64) -> Self {
        self.typewriter_rate_ms = Some(ms);
        self
    }

    /// Set agent override
    #[must_use]
    pub fn with_agent(mut self, agent: String) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the overridden configuration fails validation.
    pub fn apply(&self, config: &mut ClientConfig) -> Result<(), ConfigError> {
        if self.base_url.is_some() || self.typewriter_rate_ms.is_some() || self.agent.is_some() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.base_url {
            config.backend.base_url = url.clone();
        }

        if let Some(ms) = self.typewriter_rate_ms {
            config.typewriter_rate = Duration::from_millis(ms);
        }

        if let Some(ref agent) = self.agent {
            config.default_agent = Some(AgentId::new(agent.clone()));
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
