//! Configuration management for the agent.
//!
//! Configuration can be set via environment variables:
//! - `ANTHROPIC_API_KEY` - Required. Credential passed through to the messages API.
//! - `AGENT_MODEL` - Optional. Model identifier. Defaults to `claude-sonnet-4-20250514`.
//! - `MAX_TOKENS` - Optional. Per-response token cap. Defaults to `4096`.
//! - `MAX_ITERATIONS` - Optional. Backend round-trips allowed per run. Defaults to `10`.
//! - `ANTHROPIC_BASE_URL` - Optional. API root. Defaults to `https://api.anthropic.com`.
//! - `WORKSPACE_PATH` - Optional. Directory tools resolve relative paths against. Defaults to current directory.
//! - `SYSTEM_PROMPT` - Optional. Sent as the `system` field when set.

use std::path::PathBuf;
use thiserror::Error;

use crate::llm::{ApiKey, DEFAULT_BASE_URL};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Anthropic API key
    pub api_key: ApiKey,

    /// Model identifier
    pub model: String,

    /// `max_tokens` sent with every request
    pub max_tokens: u32,

    /// Maximum backend round-trips per run (always >= 1)
    pub max_iterations: usize,

    /// API root, without the `/v1/messages` suffix
    pub base_url: String,

    /// Workspace directory for file and shell tools
    pub workspace_path: PathBuf,

    /// Optional system prompt
    pub system_prompt: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `ANTHROPIC_API_KEY` is not set,
    /// and `ConfigError::InvalidValue` for unparsable numbers or a zero iteration bound.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;
        Self::from_env_with_key(api_key)
    }

    /// Like [`Config::from_env`], but with the credential supplied by the caller
    /// (e.g. from the command line).
    pub fn from_env_with_key(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        Self::from_lookup(api_key.into(), lookup)
    }

    fn from_lookup<F>(api_key: String, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if api_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "ANTHROPIC_API_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let model = lookup("AGENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_tokens = lookup("MAX_TOKENS")
            .map(|v| {
                v.parse::<u32>()
                    .map_err(|e| ConfigError::InvalidValue("MAX_TOKENS".to_string(), format!("{}", e)))
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let max_iterations = lookup("MAX_ITERATIONS")
            .map(|v| parse_iteration_bound(&v))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_ITERATIONS);

        let base_url = lookup("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let workspace_path = lookup("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let system_prompt = lookup("SYSTEM_PROMPT").filter(|s| !s.trim().is_empty());

        Ok(Self {
            api_key: ApiKey::new(api_key),
            model,
            max_tokens,
            max_iterations,
            base_url,
            workspace_path,
            system_prompt,
        })
    }

    /// Create a config with default values (useful for testing).
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: ApiKey::new(api_key),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            base_url: DEFAULT_BASE_URL.to_string(),
            workspace_path: PathBuf::from("."),
            system_prompt: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the iteration bound. Values below 1 are raised to 1.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_workspace(mut self, workspace_path: impl Into<PathBuf>) -> Self {
        self.workspace_path = workspace_path.into();
        self
    }
}

fn parse_iteration_bound(value: &str) -> Result<usize, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), msg);
    match value.trim().parse::<usize>() {
        Ok(0) => Err(invalid("must be at least 1".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(format!("{}", e))),
    }
}
