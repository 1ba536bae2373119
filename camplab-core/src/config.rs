//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/camplab/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/camplab/` (~/.config/camplab/)
//! - State/Logs: `$XDG_STATE_HOME/camplab/` (~/.local/state/camplab/)

use crate::error::{Error, Result};
use crate::persona::Persona;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `gateway.api_key`
pub const API_KEY_ENV: &str = "CAMPLAB_API_KEY";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Remote assistant endpoint
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Who is talking to the assistant (optional)
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Conversation behaviour
    #[serde(default)]
    pub session: SessionConfig,

    /// Hosted conversation archive (optional)
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Assistant gateway configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Full URL of the assistant function (e.g. `https://x.supabase.co/functions/v1/lab-ai-coaching`)
    pub endpoint: Option<String>,

    /// Static bearer credential (can also use `CAMPLAB_API_KEY`)
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,

    /// Retry attempts for transient failures (0 disables retry)
    #[serde(default)]
    pub max_retries: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_gateway_timeout(),
            max_retries: 0,
        }
    }
}

impl GatewayConfig {
    /// API key from the environment, falling back to the config file
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }

    /// Check if the gateway has everything it needs to make calls
    pub fn is_ready(&self) -> bool {
        self.endpoint.is_some() && self.resolved_api_key().is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        match &self.endpoint {
            None => {
                return Err(Error::Config("gateway.endpoint is required".to_string()));
            }
            Some(endpoint) if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") => {
                return Err(Error::Config(format!(
                    "gateway.endpoint must be an http(s) URL, got {:?}",
                    endpoint
                )));
            }
            Some(_) => {}
        }
        if self.resolved_api_key().is_none() {
            return Err(Error::Config(format!(
                "gateway.api_key is required (or set {})",
                API_KEY_ENV
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "gateway.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_gateway_timeout() -> u64 {
    30
}

/// Identity forwarded to the assistant with every message
#[derive(Debug, Deserialize, Clone, Default)]
pub struct IdentityConfig {
    /// Backend user id (also keys archived conversations)
    pub user_id: Option<String>,
    /// Connected wallet address
    pub wallet_address: Option<String>,
}

/// Session behaviour
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Which assistant persona to talk to
    #[serde(default)]
    pub persona: Persona,

    /// Number of earlier messages sent along as context
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Maximum knowledge snippets attached to one request
    #[serde(default = "default_max_knowledge_snippets")]
    pub max_knowledge_snippets: usize,

    /// JSON file replacing the built-in knowledge base
    pub knowledge_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persona: Persona::default(),
            context_window: default_context_window(),
            max_knowledge_snippets: default_max_knowledge_snippets(),
            knowledge_path: None,
        }
    }
}

fn default_context_window() -> usize {
    3
}

fn default_max_knowledge_snippets() -> usize {
    20
}

/// Hosted conversation archive configuration
///
/// When enabled, every completed exchange is written to a table on the
/// hosted backend. Archive failures never interrupt the conversation.
#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    /// Enable/disable archiving
    #[serde(default)]
    pub enabled: bool,

    /// Backend project URL (e.g., `https://project.supabase.co`)
    pub base_url: Option<String>,

    /// Backend API key
    pub api_key: Option<String>,

    /// Table holding archived exchanges
    #[serde(default = "default_archive_table")]
    pub table: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_archive_timeout")]
    pub timeout_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            api_key: None,
            table: default_archive_table(),
            timeout_secs: default_archive_timeout(),
        }
    }
}

impl ArchiveConfig {
    /// Check if the archive is properly configured and enabled
    pub fn is_ready(&self) -> bool {
        self.enabled && self.base_url.is_some() && self.api_key.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.base_url.is_none() {
            return Err(Error::Config(
                "archive.base_url is required when archive is enabled".to_string(),
            ));
        }
        if self.api_key.is_none() {
            return Err(Error::Config(
                "archive.api_key is required when archive is enabled".to_string(),
            ));
        }
        if self.table.trim().is_empty() {
            return Err(Error::Config("archive.table must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "archive.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_archive_table() -> String {
    "lab_conversations".to_string()
}

fn default_archive_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/camplab/config.toml` (~/.config/camplab/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("camplab").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/camplab/` (~/.local/state/camplab/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("camplab")
    }
}
