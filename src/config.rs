//! Configuration management for sandbox-agent.
//!
//! Configuration can be set via environment variables (a `.env` file is
//! loaded first by the binary):
//! - `GEMINI_API_KEY` - Required. API key for the Gemini API.
//! - `GEMINI_MODEL` - Optional. Model identifier. Defaults to `gemini-2.0-flash-001`.
//! - `GEMINI_BASE_URL` - Optional. API base URL. Defaults to the public v1beta endpoint.
//! - `AGENT_WORKING_DIR` - Optional. Sandbox root for all tools. Defaults to `./calculator`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations. Defaults to `20`.
//! - `SCRIPT_TIMEOUT_SECS` - Optional. Script execution timeout. Defaults to `30`.
//! - `SCRIPT_INTERPRETER` - Optional. Program used to run scripts. Defaults to `python3`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::agent::DEFAULT_MAX_ITERATIONS;
use crate::tools::ScriptRunner;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_WORKING_DIR: &str = "./calculator";

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
    /// Gemini API key
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// API base URL
    pub base_url: String,

    /// Sandbox root for file operations
    pub working_dir: PathBuf,

    /// Maximum iterations for the agent loop
    pub max_iterations: usize,

    /// How scripts are executed
    pub scripts: ScriptRunner,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `GEMINI_API_KEY` is unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model = lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = lookup("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let working_dir = lookup("AGENT_WORKING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKING_DIR));

        let max_iterations = parse_var(&lookup, "MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?;
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let mut scripts = ScriptRunner::default();
        let timeout_secs = parse_var(&lookup, "SCRIPT_TIMEOUT_SECS", scripts.timeout.as_secs())?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SCRIPT_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        scripts.timeout = Duration::from_secs(timeout_secs);
        if let Some(interpreter) = lookup("SCRIPT_INTERPRETER") {
            scripts.interpreter = interpreter;
        }

        Ok(Self {
            api_key,
            model,
            base_url,
            working_dir,
            max_iterations,
            scripts,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, working_dir: PathBuf) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            working_dir,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            scripts: ScriptRunner::default(),
        }
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e))),
        None => Ok(default),
    }
}
