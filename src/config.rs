//! Configuration management for MaxChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use anyhow::Context;
use crate::error::{MaxchatError, Result};
use crate::session::{
    DEFAULT_CONTEXT_WINDOW, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for MaxChat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ollama server settings
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Chat session defaults
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model selected at startup
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Connect and model-listing timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Chat session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Initial system prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Default sampling temperature, restored by `/clear`
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Default context window, restored by `/clear`
    #[serde(default = "default_context_window")]
    pub context_window: u32,

    /// Directory holding saved chats
    #[serde(default = "default_chats_dir")]
    pub chats_dir: String,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_context_window() -> u32 {
    DEFAULT_CONTEXT_WINDOW
}

fn default_chats_dir() -> String {
    "chats".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            context_window: default_context_window(),
            chats_dir: default_chats_dir(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            tracing::debug!("Loading config from {}", path);
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(MaxchatError::Io)
            .with_context(|| format!("Failed to read config file {}", path))?;
        serde_yaml::from_str(&contents)
            .map_err(MaxchatError::Yaml)
            .with_context(|| format!("Failed to parse config {}", path))
    }

    fn apply_env_vars(&mut self) {
        if let Ok(host) = std::env::var("MAXCHAT_OLLAMA_HOST") {
            self.ollama.host = host;
        }

        if let Ok(model) = std::env::var("MAXCHAT_OLLAMA_MODEL") {
            self.ollama.model = model;
        }

        if let Ok(dir) = std::env::var("MAXCHAT_CHATS_DIR") {
            self.chat.chats_dir = dir;
        }

        if let Ok(prompt) = std::env::var("MAXCHAT_SYSTEM_PROMPT") {
            self.chat.system_prompt = prompt;
        }

        if let Ok(temperature) = std::env::var("MAXCHAT_TEMPERATURE") {
            if let Ok(value) = temperature.parse() {
                self.chat.temperature = value;
            } else {
                tracing::warn!("Invalid MAXCHAT_TEMPERATURE: {}", temperature);
            }
        }

        if let Ok(context_window) = std::env::var("MAXCHAT_CONTEXT_WINDOW") {
            if let Ok(value) = context_window.parse() {
                self.chat.context_window = value;
            } else {
                tracing::warn!("Invalid MAXCHAT_CONTEXT_WINDOW: {}", context_window);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(host) = &cli.host {
            self.ollama.host = host.clone();
        }
        if let Some(model) = &cli.model {
            self.ollama.model = model.clone();
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.ollama.host.trim().is_empty() {
            return Err(MaxchatError::Config("ollama.host cannot be empty".to_string()).into());
        }

        if !self.ollama.host.starts_with("http://") && !self.ollama.host.starts_with("https://") {
            return Err(MaxchatError::Config(format!(
                "ollama.host must start with http:// or https://: {}",
                self.ollama.host
            ))
            .into());
        }

        if self.ollama.model.trim().is_empty() {
            return Err(MaxchatError::Config("ollama.model cannot be empty".to_string()).into());
        }

        if self.ollama.timeout_seconds == 0 {
            return Err(MaxchatError::Config(
                "ollama.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.system_prompt.trim().is_empty() {
            return Err(
                MaxchatError::Config("chat.system_prompt cannot be empty".to_string()).into(),
            );
        }

        if !self.chat.temperature.is_finite() || !(0.0..=1.0).contains(&self.chat.temperature) {
            return Err(MaxchatError::Config(
                "chat.temperature must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        if self.chat.context_window == 0 {
            return Err(MaxchatError::Config(
                "chat.context_window must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.chats_dir.trim().is_empty() {
            return Err(
                MaxchatError::Config("chat.chats_dir cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}
