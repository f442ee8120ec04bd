//! Provider module for MaxChat
//!
//! This module contains the chat backend abstraction and its Ollama
//! implementation.

pub mod base;
pub mod ollama;

pub use base::{
    ChatChunk, ChatStream, GenerationOptions, Message, ModelInfo, Provider, Role, StreamStats,
};
pub use ollama::{decode_chat_stream, OllamaProvider};

use crate::config::OllamaConfig;
use crate::error::Result;

/// Create the chat backend from configuration
///
/// # Arguments
///
/// * `config` - Ollama configuration
///
/// # Returns
///
/// Returns a boxed provider instance
///
/// # Errors
///
/// Returns error if provider initialization fails
pub fn create_provider(config: &OllamaConfig) -> Result<Box<dyn Provider>> {
    Ok(Box::new(OllamaProvider::new(config.clone())?))
}
