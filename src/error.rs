//! Error types for MaxChat
//!
//! This module defines the crate-wide error type, using `thiserror` for
//! ergonomic error handling. Command parsing and session validation keep
//! their own small error enums next to the code that produces them.

use thiserror::Error;

/// Main error type for MaxChat operations
///
/// Covers configuration loading, backend (Ollama) interactions, response
/// streaming, and saved-chat storage.
#[derive(Error, Debug)]
pub enum MaxchatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (connection failures, non-success status codes)
    #[error("Provider error: {0}")]
    Provider(String),

    /// The response stream failed part way through
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    /// The response stream ended without a final `done` fragment
    #[error("Response stream ended before completion")]
    StreamIncomplete,

    /// No saved chat exists under the requested name
    #[error("Saved chat not found: {0}")]
    ChatNotFound(String),

    /// Chat name cannot be mapped to a storage key
    #[error("Invalid chat name: {0}")]
    InvalidChatName(String),

    /// Saved chat exists but does not describe a valid transcript
    #[error("Corrupt saved chat {name}: {reason}")]
    CorruptChat {
        /// Name of the saved chat
        name: String,
        /// What was wrong with it
        reason: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for MaxChat operations
///
/// Uses `anyhow::Error` as the error type so callers can attach context
/// and propagate with `?`.
pub type Result<T> = anyhow::Result<T>;
