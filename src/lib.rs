//! MaxChat - interactive chat client library for a local Ollama server
//!
//! This library provides the pieces behind the `maxchat` binary: the session
//! state machine, the slash-command dispatcher, the streaming engine, the
//! Ollama backend, and saved-chat storage.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Model, system prompt, transcript, and generation parameters
//! - `commands`: Command grammar, dispatcher, streaming turns, and the chat loop
//! - `providers`: Chat backend abstraction and the Ollama implementation
//! - `storage`: JSON files for saved chats
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use maxchat::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!     maxchat::commands::chat::run_chat(config).await
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod providers;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{MaxchatError, Result};
pub use session::Session;

#[cfg(test)]
pub mod test_utils;
