//! Configuration loading, validation, and management for stepwise.
//!
//! Loads configuration from `~/.stepwise/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.stepwise/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override for OpenAI-compatible endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// ReAct loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4.1-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Settings for the Thought/Action/Observation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on model calls per run
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Narrative length above which an answer following a tool call counts as final
    #[serde(default = "default_min_answer_chars")]
    pub min_answer_chars: usize,

    /// Maximum characters per `observation_chunk` event
    #[serde(default = "default_observation_chunk_chars")]
    pub observation_chunk_chars: usize,

    /// Tools exposed to the agent. Empty means every registered tool.
    #[serde(default)]
    pub enabled_tools: Vec<String>,
}

fn default_max_steps() -> usize {
    20
}
fn default_min_answer_chars() -> usize {
    80
}
fn default_observation_chunk_chars() -> usize {
    512
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            min_answer_chars: default_min_answer_chars(),
            observation_chunk_chars: default_observation_chunk_chars(),
            enabled_tools: Vec::new(),
        }
    }
}

/// Settings for the built-in tools.
#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Root the file tools expose as `knowledge_base/`
    #[serde(default = "default_knowledge_base_path")]
    pub knowledge_base_path: PathBuf,

    /// Root the file tools expose as `output/`
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Brave Search subscription token for `web_search`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brave_api_key: Option<String>,
}

fn default_knowledge_base_path() -> PathBuf {
    PathBuf::from("./knowledge_base")
}
fn default_output_path() -> PathBuf {
    PathBuf::from("./output")
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            knowledge_base_path: default_knowledge_base_path(),
            output_path: default_output_path(),
            brave_api_key: None,
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("knowledge_base_path", &self.knowledge_base_path)
            .field("output_path", &self.output_path)
            .field("brave_api_key", &redact(&self.brave_api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Wall-clock limit for one streamed run
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_run_timeout_secs() -> u64 {
    300
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            run_timeout_secs: default_run_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.stepwise/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `var`.
    ///
    /// - `STEPWISE_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `STEPWISE_PROVIDER`
    /// - `STEPWISE_MODEL`, then `OPENAI_MODEL_NAME`
    /// - `FILE_TOOLS_KNOWLEDGE_BASE_PATH`, `FILE_TOOLS_OUTPUT_PATH`
    /// - `BRAVE_API_KEY` (only when no key is configured)
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = var("STEPWISE_API_KEY").or_else(|| var("OPENAI_API_KEY"));
        }

        if let Some(provider) = var("STEPWISE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = var("STEPWISE_MODEL").or_else(|| var("OPENAI_MODEL_NAME")) {
            self.default_model = model;
        }

        if let Some(path) = var("FILE_TOOLS_KNOWLEDGE_BASE_PATH") {
            self.tools.knowledge_base_path = PathBuf::from(path);
        }

        if let Some(path) = var("FILE_TOOLS_OUTPUT_PATH") {
            self.tools.output_path = PathBuf::from(path);
        }

        if self.tools.brave_api_key.is_none() {
            self.tools.brave_api_key = var("BRAVE_API_KEY");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stepwise")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.min_answer_chars == 0 {
            return Err(ConfigError::ValidationError(
                "agent.min_answer_chars must be > 0".into(),
            ));
        }

        if self.agent.observation_chunk_chars == 0 {
            return Err(ConfigError::ValidationError(
                "agent.observation_chunk_chars must be > 0".into(),
            ));
        }

        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a starter config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let body = toml::to_string_pretty(&Self::default()).unwrap_or_default();
        format!(
            "# stepwise configuration\n\
             # api_key = \"sk-...\"        # or set STEPWISE_API_KEY / OPENAI_API_KEY\n\
             # api_url = \"http://localhost:11434/v1\"\n\n{body}"
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
