//! Base provider trait and common types for MaxChat
//!
//! This module defines the Provider trait that the chat loop talks to, along
//! with the message type shared by the session, the backend, and saved chats,
//! and the fragment type produced by streaming completions.

use crate::error::Result;
use crate::session::{DEFAULT_CONTEXT_WINDOW, DEFAULT_TEMPERATURE};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The privileged first message establishing assistant behavior
    System,
    /// A message typed by the user
    User,
    /// A reply produced by the model
    Assistant,
}

impl Role {
    /// Label used when printing the transcript
    ///
    /// # Examples
    ///
    /// ```
    /// use maxchat::providers::Role;
    ///
    /// assert_eq!(Role::User.label(), "User");
    /// assert_eq!(Role::Assistant.label(), "AI");
    /// ```
    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "AI",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Message structure for conversation
///
/// Serializes to the `{"role": ..., "content": ...}` shape used both by the
/// Ollama chat API and by saved chat files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new system message
    ///
    /// # Examples
    ///
    /// ```
    /// use maxchat::providers::{Message, Role};
    ///
    /// let msg = Message::system("You are a helpful assistant");
    /// assert_eq!(msg.role, Role::System);
    /// ```
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use maxchat::providers::{Message, Role};
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Model information as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier (e.g., "llama3.2:latest")
    pub name: String,
    /// Model family (e.g., "llama")
    pub family: String,
    /// Parameter size (e.g., "3.2B")
    pub parameter_size: String,
}

impl ModelInfo {
    /// Create a new ModelInfo instance
    ///
    /// # Examples
    ///
    /// ```
    /// use maxchat::providers::ModelInfo;
    ///
    /// let model = ModelInfo::new("llama3.2:latest", "llama", "3.2B");
    /// assert_eq!(model.to_string(), "llama3.2:latest - llama - 3.2B");
    /// ```
    pub fn new(
        name: impl Into<String>,
        family: impl Into<String>,
        parameter_size: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            family: family.into(),
            parameter_size: parameter_size.into(),
        }
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} - {}", self.name, self.family, self.parameter_size)
    }
}

/// Sampling options sent with every chat request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature in [0, 1]
    pub temperature: f32,
    /// Context window size in tokens
    pub context_window: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

/// Performance metadata carried by the final fragment of a stream
///
/// All durations are in nanoseconds, as reported by Ollama.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Number of tokens generated
    pub eval_count: u64,
    /// Time spent generating tokens
    pub eval_duration: u64,
    /// Time spent loading the model
    pub load_duration: u64,
    /// Time spent evaluating the prompt
    pub prompt_eval_duration: u64,
}

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

impl StreamStats {
    /// Generation rate in tokens per second
    ///
    /// Returns 0.0 when no evaluation time was reported.
    ///
    /// # Examples
    ///
    /// ```
    /// use maxchat::providers::StreamStats;
    ///
    /// let stats = StreamStats {
    ///     eval_count: 2,
    ///     eval_duration: 2_000_000_000,
    ///     ..Default::default()
    /// };
    /// assert_eq!(stats.tokens_per_second(), 1.0);
    /// ```
    pub fn tokens_per_second(&self) -> f64 {
        if self.eval_duration == 0 {
            return 0.0;
        }
        self.eval_count as f64 / self.eval_duration as f64 * NANOS_PER_SECOND
    }

    /// Model load time in seconds
    pub fn load_seconds(&self) -> f64 {
        self.load_duration as f64 / NANOS_PER_SECOND
    }

    /// Prompt evaluation time in seconds
    pub fn prompt_eval_seconds(&self) -> f64 {
        self.prompt_eval_duration as f64 / NANOS_PER_SECOND
    }
}

impl fmt::Display for StreamStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token/s: {:.2} - Load model: {:.2}s - Prompt eval: {:.2}s",
            self.tokens_per_second(),
            self.load_seconds(),
            self.prompt_eval_seconds()
        )
    }
}

/// One incremental piece of a streamed assistant reply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatChunk {
    /// Content fragment (may be empty, typically on the final chunk)
    pub content: String,
    /// Whether this is the final chunk of the response
    pub done: bool,
    /// Performance metadata, present on the final chunk
    pub stats: Option<StreamStats>,
}

impl ChatChunk {
    /// Creates an intermediate content fragment
    pub fn fragment(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
            stats: None,
        }
    }

    /// Creates the final fragment of a stream
    pub fn done(content: impl Into<String>, stats: StreamStats) -> Self {
        Self {
            content: content.into(),
            done: true,
            stats: Some(stats),
        }
    }
}

/// Lazy sequence of reply fragments
///
/// The stream yields fragments until one with `done == true`, then ends.
/// Any item may instead be an error, after which the stream ends.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// Provider trait for chat backends
///
/// The chat loop only needs two capabilities from a backend: enumerating
/// models and streaming a chat completion.
///
/// # Examples
///
/// ```no_run
/// use maxchat::providers::{ChatChunk, ChatStream, GenerationOptions, Message, ModelInfo, Provider};
/// use maxchat::error::Result;
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl Provider for EchoProvider {
///     async fn list_models(&self) -> Result<Vec<ModelInfo>> {
///         Ok(vec![ModelInfo::new("echo", "echo", "0B")])
///     }
///
///     async fn stream_chat(
///         &self,
///         _model: &str,
///         messages: &[Message],
///         _options: &GenerationOptions,
///     ) -> Result<ChatStream> {
///         let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
///         let chunks = vec![Ok(ChatChunk::done(last, Default::default()))];
///         Ok(Box::pin(futures::stream::iter(chunks)))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// List available models
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached or responds with an error
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Start a streaming chat completion
    ///
    /// # Arguments
    ///
    /// * `model` - Model identifier to use
    /// * `messages` - Full conversation, system prompt first, new user message last
    /// * `options` - Sampling options
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent or is rejected. Failures
    /// after the response has started arrive as error items in the stream.
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<ChatStream>;
}
