//! Command-line interface definition for MaxChat
//!
//! This module defines the CLI structure using clap's derive API. The program
//! has no subcommands; running it starts an interactive chat.

use clap::Parser;

/// MaxChat - interactive terminal chat with a local Ollama server
///
/// Streams replies token by token and supports slash-commands for switching
/// models, editing the system prompt, saving and loading chats, and tuning
/// generation parameters. Type /help inside the chat for the command list.
#[derive(Parser, Debug, Clone)]
#[command(name = "maxchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the Ollama host from config (e.g. http://localhost:11434)
    #[arg(long)]
    pub host: Option<String>,

    /// Override the model selected at startup
    #[arg(short, long)]
    pub model: Option<String>,
}

impl Cli {
    /// Parse command-line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            host: None,
            model: None,
        }
    }
}
