//! Conversation session state
//!
//! The [`Session`] is the single source of truth for the context sent to the
//! backend on every turn: the selected model, the system prompt, the ordered
//! transcript, and the generation parameters.
//!
//! The transcript always holds exactly one system message, at index 0, equal
//! to the live system prompt. Every mutating operation preserves this.

use crate::providers::{GenerationOptions, Message, Role};
use thiserror::Error;

/// Model selected when nothing else is configured
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// System prompt used when nothing else is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant called MAX. Reply from now on in Italian even if the requests are in other languages.";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default context window in tokens
pub const DEFAULT_CONTEXT_WINDOW: u32 = 2048;

/// Errors from session state transitions
///
/// None of these mutate the session; the caller reports them and continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The new system prompt was empty
    #[error("specify valid content for the SYSTEM_PROMPT.")]
    EmptySystemPrompt,

    /// Temperature was not a number in [0, 1]
    #[error("Invalid temperature. Please provide a value between 0 and 1.")]
    InvalidTemperature(String),

    /// Context window was not a positive integer
    #[error("Invalid num_ctx. Please provide a positive integer.")]
    InvalidContextWindow(String),

    /// A restored transcript violates the system-message invariant
    #[error("{0}")]
    InvalidSnapshot(String),
}

/// Outcome of a `/params` update
///
/// Each parameter is validated independently, so one may be applied while
/// the other is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamsUpdate {
    /// Applied temperature, or why it was rejected
    pub temperature: Result<f32, SessionError>,
    /// Applied context window, or why it was rejected
    pub context_window: Result<u32, SessionError>,
}

/// A single interactive conversation
#[derive(Debug, Clone)]
pub struct Session {
    model: String,
    system_prompt: String,
    transcript: Vec<Message>,
    params: GenerationOptions,
    default_params: GenerationOptions,
}

impl Session {
    /// Create a session with default generation parameters
    ///
    /// # Examples
    ///
    /// ```
    /// use maxchat::session::{Session, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
    ///
    /// let session = Session::new(DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT);
    /// assert_eq!(session.transcript().len(), 1);
    /// assert_eq!(session.params().temperature, 0.7);
    /// ```
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self::with_params(model, system_prompt, GenerationOptions::default())
    }

    /// Create a session whose parameter defaults are `params`
    ///
    /// `clear()` restores `params`, not the built-in defaults.
    pub fn with_params(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        params: GenerationOptions,
    ) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            model: model.into(),
            transcript: vec![Message::system(system_prompt.clone())],
            system_prompt,
            params,
            default_params: params,
        }
    }

    /// Currently selected model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Live system prompt text
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Ordered conversation history, system prompt first
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Current generation parameters
    pub fn params(&self) -> GenerationOptions {
        self.params
    }

    /// Parameters restored by `clear()`
    pub fn default_params(&self) -> GenerationOptions {
        self.default_params
    }

    /// Replace the system prompt and reset the transcript
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptySystemPrompt` if `text` is empty or only
    /// whitespace; the session is left unchanged.
    pub fn set_system_prompt(&mut self, text: &str) -> Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptySystemPrompt);
        }
        self.system_prompt = text.to_string();
        self.reset_transcript();
        tracing::debug!("System prompt replaced");
        Ok(())
    }

    /// Reset the transcript and restore default generation parameters
    pub fn clear(&mut self) {
        self.reset_transcript();
        self.params = self.default_params;
    }

    /// Switch model and reset the transcript
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        self.reset_transcript();
        tracing::debug!(model = %self.model, "Model switched");
    }

    /// Drop every turn, keeping only the system prompt
    pub fn reset_transcript(&mut self) {
        self.transcript.clear();
        let system = Message::system(self.system_prompt.clone());
        self.transcript.push(system);
    }

    /// Validate and apply raw `/params` input
    ///
    /// Temperature must parse as a finite number in [0, 1]; the context window
    /// must parse as an integer greater than zero. An invalid value leaves its
    /// parameter unchanged without affecting the other.
    ///
    /// # Examples
    ///
    /// ```
    /// use maxchat::session::Session;
    ///
    /// let mut session = Session::new("llama3.2:latest", "Be brief");
    /// let update = session.set_params("1.5", "4096");
    /// assert!(update.temperature.is_err());
    /// assert_eq!(update.context_window, Ok(4096));
    /// assert_eq!(session.params().temperature, 0.7);
    /// assert_eq!(session.params().context_window, 4096);
    /// ```
    pub fn set_params(&mut self, temperature: &str, context_window: &str) -> ParamsUpdate {
        let temperature = parse_temperature(temperature);
        if let Ok(value) = temperature {
            self.params.temperature = value;
        }

        let context_window = parse_context_window(context_window);
        if let Ok(value) = context_window {
            self.params.context_window = value;
        }

        ParamsUpdate {
            temperature,
            context_window,
        }
    }

    /// Commit a completed turn
    ///
    /// Appends the user message then the assistant message. Returns `false`
    /// and appends nothing when the reply is empty.
    pub fn append_turn(&mut self, user_text: &str, assistant_text: &str) -> bool {
        if assistant_text.is_empty() {
            return false;
        }
        self.transcript.push(Message::user(user_text));
        self.transcript.push(Message::assistant(assistant_text));
        true
    }

    /// Messages to send for a new user turn: the transcript plus `user_text`
    pub fn request_messages(&self, user_text: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.transcript.len() + 1);
        messages.extend_from_slice(&self.transcript);
        messages.push(Message::user(user_text));
        messages
    }

    /// Replace model and transcript from a saved snapshot
    ///
    /// Generation parameters are not touched. The live system prompt becomes
    /// the snapshot's system message.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidSnapshot` unless `messages` is non-empty
    /// and holds exactly one system message at index 0. The session is left
    /// unchanged on error.
    pub fn restore(&mut self, model: &str, messages: Vec<Message>) -> Result<(), SessionError> {
        validate_transcript(&messages)?;
        self.system_prompt = messages[0].content.clone();
        self.model = model.to_string();
        self.transcript = messages;
        Ok(())
    }
}

fn validate_transcript(messages: &[Message]) -> Result<(), SessionError> {
    match messages.first() {
        None => Err(SessionError::InvalidSnapshot(
            "transcript is empty".to_string(),
        )),
        Some(first) if first.role != Role::System => Err(SessionError::InvalidSnapshot(
            "first message is not a system message".to_string(),
        )),
        Some(_) if messages[1..].iter().any(|m| m.role == Role::System) => Err(
            SessionError::InvalidSnapshot("more than one system message".to_string()),
        ),
        Some(_) => Ok(()),
    }
}

fn parse_temperature(input: &str) -> Result<f32, SessionError> {
    let input = input.trim();
    match input.parse::<f32>() {
        Ok(value) if value.is_finite() && (0.0..=1.0).contains(&value) => Ok(value),
        _ => Err(SessionError::InvalidTemperature(input.to_string())),
    }
}

fn parse_context_window(input: &str) -> Result<u32, SessionError> {
    let input = input.trim();
    match input.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(SessionError::InvalidContextWindow(input.to_string())),
    }
}
