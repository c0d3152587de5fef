//! Configuration system for the ratings agent
//!
//! Configuration is a single TOML file. Secrets are never stored in it: the
//! file names the environment variable that holds the LLM API key and the key
//! is resolved at runtime.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default agent identifier exposed on the A2A route
pub const DEFAULT_AGENT_ID: &str = "playStoreAgent";

/// Main agent configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub llm: LlmSection,
    #[serde(default)]
    pub agents: AgentsSection,
    #[serde(default)]
    pub lookup: LookupSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub schedule: ScheduleSection,
}

/// HTTP server section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Controls whether internal error responses carry debug detail
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4111
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// LLM section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name; only OpenAI-compatible chat completion APIs are supported
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Environment variable containing API key
    pub api_key_env: String,
    /// Override for the provider base URL (e.g. an OpenAI-compatible Gemini endpoint)
    pub base_url: Option<String>,
    /// Replaces the built-in assistant instructions when set
    pub system_prompt: Option<String>,
    /// Optional temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Optional max tokens
    pub max_tokens: Option<u32>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_timeout_secs() -> u64 {
    60
}

/// Agent registry section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentsSection {
    /// Identifiers served under `/a2a/agent/{id}`
    #[serde(default = "default_agent_ids")]
    pub ids: Vec<String>,
}

impl Default for AgentsSection {
    fn default() -> Self {
        Self {
            ids: default_agent_ids(),
        }
    }
}

fn default_agent_ids() -> Vec<String> {
    vec![DEFAULT_AGENT_ID.to_string()]
}

/// Rating lookup service section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupSection {
    /// Base URL of a google-play-scraper compatible REST API
    #[serde(default = "default_lookup_base_url")]
    pub base_url: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LookupSection {
    fn default() -> Self {
        Self {
            base_url: default_lookup_base_url(),
            country: default_country(),
            language: default_language(),
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

fn default_lookup_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_lookup_timeout_secs() -> u64 {
    30
}

/// History store section; no path means no store is configured
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistorySection {
    pub path: Option<PathBuf>,
}

/// Scheduled pipeline section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSection {
    #[serde(default)]
    pub app_names: Vec<String>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            app_names: Vec::new(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    3600
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid agent ID format: {0}")]
    InvalidAgentId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AgentConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agents.ids.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "[agents] ids must name at least one agent".to_string(),
            ));
        }
        for id in &self.agents.ids {
            validate_agent_id(id)?;
        }

        if self.llm.provider != "openai" {
            return Err(ConfigError::InvalidConfig(format!(
                "Unsupported LLM provider: {}",
                self.llm.provider
            )));
        }

        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature must be between 0.0 and 2.0, got {temperature}"
                )));
            }
        }

        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "schedule.interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Get LLM API key from environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.llm.api_key_env.clone()))
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[server]
environment = "development"

[llm]
provider = "openai"
model = "gemini-2.0-flash"
api_key_env = "RATINGS_AGENT_TEST_KEY"
temperature = 0.2

[agents]
ids = ["playStoreAgent", "weatherAgent"]
"#;
        Self::from_toml_str(toml_content).expect("Test config should parse")
    }
}

/// Validate agent ID format: `[a-zA-Z0-9._-]+`
fn validate_agent_id(agent_id: &str) -> Result<(), ConfigError> {
    let valid_chars = agent_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if agent_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidAgentId(format!(
            "Agent ID '{agent_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
