//! Command dispatch for the interactive chat loop
//!
//! [`ChatDispatcher`] owns the session, the backend, and the chat store. It
//! reads one line at a time from a [`LineSource`], routes it to a command
//! handler or the streaming engine, and writes everything user-visible to a
//! single output. Errors from individual commands are reported there and the
//! loop carries on; only output failures and the startup model listing end it.

use crate::commands::special_commands::{parse_special_command, write_help, SpecialCommand};
use crate::commands::streaming::run_turn;
use crate::error::{MaxchatError, Result};
use crate::providers::Provider;
use crate::session::Session;
use crate::storage::{ChatStore, SavedChat};
use colored::Colorize;
use std::io::Write;

const USER_PROMPT: &str = "User: ";
const MODEL_PROMPT: &str = "Select a model by entering the corresponding number: ";
const CHAT_PROMPT: &str = "Select a chat by entering the corresponding number: ";

/// Source of input lines
///
/// Implemented over rustyline for the terminal, and by scripted input in tests.
pub trait LineSource {
    /// Show `prompt` and read one line
    ///
    /// Returns `Ok(None)` at end of input or on interrupt.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Record an accepted chat line in the input history
    fn add_history(&mut self, _line: &str) {}
}

/// Whether the loop should keep going after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The chat loop state: one session, one backend, one store, one output
pub struct ChatDispatcher<W: Write> {
    session: Session,
    provider: Box<dyn Provider>,
    store: ChatStore,
    out: W,
}

impl<W: Write> ChatDispatcher<W> {
    /// Create a dispatcher
    ///
    /// # Arguments
    ///
    /// * `session` - Initial session state
    /// * `provider` - Chat backend
    /// * `store` - Saved chat storage
    /// * `out` - Where all user-visible output goes
    pub fn new(session: Session, provider: Box<dyn Provider>, store: ChatStore, out: W) -> Self {
        Self {
            session,
            provider,
            store,
            out,
        }
    }

    /// Current session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Consume the dispatcher and return its output
    pub fn into_output(self) -> W {
        self.out
    }

    /// Print the welcome banner and command table, then run model selection
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot list models. This is the one
    /// backend failure that is not recovered from.
    pub async fn start<L: LineSource>(&mut self, input: &mut L) -> Result<()> {
        writeln!(
            self.out,
            "{}",
            "Welcome to MaxChat!\n\nHere are the available commands:".blue()
        )?;
        write_help(&mut self.out)?;
        self.select_model(input).await
    }

    /// Read and dispatch lines until exit or end of input
    ///
    /// # Errors
    ///
    /// Returns error only if reading input or writing output fails
    pub async fn run<L: LineSource>(&mut self, input: &mut L) -> Result<()> {
        loop {
            let Some(line) = input.read_line(USER_PROMPT)? else {
                break;
            };
            if self.dispatch(&line, input).await? == Flow::Exit {
                break;
            }
        }
        writeln!(self.out, "{}", "Goodbye!".blue())?;
        Ok(())
    }

    /// Handle a single line of input
    ///
    /// # Errors
    ///
    /// Returns error only if reading input or writing output fails; command
    /// failures are reported to the output instead.
    pub async fn dispatch<L: LineSource>(&mut self, line: &str, input: &mut L) -> Result<Flow> {
        let command = match parse_special_command(line) {
            Ok(command) => command,
            Err(e) => {
                writeln!(self.out, "{}", e.to_string().red())?;
                return Ok(Flow::Continue);
            }
        };
        tracing::debug!(?command, "Dispatching");

        match command {
            SpecialCommand::Exit => return Ok(Flow::Exit),
            SpecialCommand::History => self.print_history()?,
            SpecialCommand::Help => write_help(&mut self.out)?,
            SpecialCommand::ListModels => {
                if let Err(e) = self.select_model(input).await {
                    tracing::warn!("Model listing failed: {:#}", e);
                    let message = format!("Error while retrieving models: {:#}", e);
                    writeln!(self.out, "{}", message.red())?;
                }
            }
            SpecialCommand::Save(name) => self.save_chat(&name)?,
            SpecialCommand::Load => self.load_chat(input)?,
            SpecialCommand::Current => {
                let message = format!("Currently used model: {}", self.session.model());
                writeln!(self.out, "{}", message.blue())?;
            }
            SpecialCommand::Clear => {
                self.session.clear();
                writeln!(
                    self.out,
                    "{}",
                    "Reset the chat history and generation parameters.".blue()
                )?;
            }
            SpecialCommand::SetSystemPrompt(text) => match self.session.set_system_prompt(&text) {
                Ok(()) => writeln!(self.out, "{}", "SYSTEM_PROMPT successfully updated!".green())?,
                Err(e) => writeln!(self.out, "{}", format!("Error: {}", e).red())?,
            },
            SpecialCommand::Params => self.prompt_params(input)?,
            SpecialCommand::Chat(text) => {
                input.add_history(&text);
                let turn = run_turn(&mut self.session, self.provider.as_ref(), &text, &mut self.out);
                if let Err(e) = turn.await {
                    writeln!(self.out, "{}", format!("Error: {:#}", e).red())?;
                }
            }
        }

        Ok(Flow::Continue)
    }

    /// Enumerate models and let the user pick one
    ///
    /// Any completed selection prompt resets the transcript, whether or not
    /// the choice was valid.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot list models, or if input or output
    /// fails. The session is unchanged when listing fails.
    pub async fn select_model<L: LineSource>(&mut self, input: &mut L) -> Result<()> {
        let models = self.provider.list_models().await?;

        writeln!(self.out, "{}", "Available models:".blue())?;
        for (i, model) in models.iter().enumerate() {
            writeln!(self.out, "{}. {}", i + 1, model)?;
        }

        let answer = input.read_line(MODEL_PROMPT)?;
        match parse_selection(answer.as_deref(), models.len()) {
            Some(index) => {
                self.session.set_model(models[index].name.clone());
                let message = format!("Selected model: {}", self.session.model());
                writeln!(self.out, "{}", message.green())?;
            }
            None => {
                self.session.reset_transcript();
                let message = format!(
                    "Invalid selection. Current model retained: {}",
                    self.session.model()
                );
                writeln!(self.out, "{}", message.red())?;
            }
        }
        Ok(())
    }

    fn print_history(&mut self) -> Result<()> {
        writeln!(self.out, "{}", "Chat history:".blue())?;
        for (i, message) in self.session.transcript().iter().enumerate() {
            writeln!(
                self.out,
                "{}. {}: {}",
                i + 1,
                message.role.label(),
                message.content
            )?;
        }
        Ok(())
    }

    fn save_chat(&mut self, name: &str) -> Result<()> {
        let chat = SavedChat::from_session(&self.session);
        match self.store.save(name, &chat) {
            Ok(_) => {
                let message = format!("Chat successfully saved in {}.json", name);
                writeln!(self.out, "{}", message.yellow())?;
            }
            Err(e) => {
                tracing::warn!("Saving chat {} failed: {:#}", name, e);
                let message = format!("Error while saving chat: {:#}", e);
                writeln!(self.out, "{}", message.red())?;
            }
        }
        Ok(())
    }

    fn load_chat<L: LineSource>(&mut self, input: &mut L) -> Result<()> {
        let keys = match self.store.list_keys() {
            Ok(keys) => keys,
            Err(e) => {
                let message = format!("Error while loading chats: {:#}", e);
                writeln!(self.out, "{}", message.red())?;
                return Ok(());
            }
        };

        if keys.is_empty() {
            writeln!(self.out, "{}", "No saved chats found.".red())?;
            return Ok(());
        }

        writeln!(self.out, "{}", "Available saved chats:".blue())?;
        for (i, key) in keys.iter().enumerate() {
            writeln!(self.out, "{}. {}", i + 1, key)?;
        }

        let answer = input.read_line(CHAT_PROMPT)?;
        let Some(index) = parse_selection(answer.as_deref(), keys.len()) else {
            writeln!(self.out, "{}", "Invalid selection.".red())?;
            return Ok(());
        };

        let name = &keys[index];
        match self.restore_chat(name) {
            Ok(()) => {
                let message = format!("Chat successfully loaded from {}", name);
                writeln!(self.out, "{}", message.green())?;
            }
            Err(e) => {
                tracing::warn!("Loading chat {} failed: {:#}", name, e);
                let message = format!("Error while loading chats: {:#}", e);
                writeln!(self.out, "{}", message.red())?;
            }
        }
        Ok(())
    }

    fn restore_chat(&mut self, name: &str) -> Result<()> {
        let chat = self.store.load(name)?;
        self.session
            .restore(&chat.model, chat.messages)
            .map_err(|e| MaxchatError::CorruptChat {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn prompt_params<L: LineSource>(&mut self, input: &mut L) -> Result<()> {
        let defaults = self.session.default_params();
        let temperature = input
            .read_line(&format!(
                "Enter temperature (0-1, default is {}): ",
                defaults.temperature
            ))?
            .unwrap_or_default();
        let context_window = input
            .read_line(&format!(
                "Enter num_ctx (positive integer, default is {}): ",
                defaults.context_window
            ))?
            .unwrap_or_default();

        let update = self.session.set_params(&temperature, &context_window);
        match update.temperature {
            Ok(value) => {
                let message = format!("Temperature successfully set to {}", value);
                writeln!(self.out, "{}", message.green())?;
            }
            Err(e) => writeln!(self.out, "{}", e.to_string().red())?,
        }
        match update.context_window {
            Ok(value) => {
                let message = format!("num_ctx successfully set to {}", value);
                writeln!(self.out, "{}", message.green())?;
            }
            Err(e) => writeln!(self.out, "{}", e.to_string().red())?,
        }
        Ok(())
    }
}

/// Parse a 1-based menu choice into an index below `len`
fn parse_selection(answer: Option<&str>, len: usize) -> Option<usize> {
    let choice: usize = answer?.trim().parse().ok()?;
    (1..=len).contains(&choice).then(|| choice - 1)
}
