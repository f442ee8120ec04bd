/*!
Command handlers for the CLI

This module provides the interactive chat loop invoked by the CLI entrypoint:

- `special_commands`: the slash-command grammar and help table
- `dispatcher`: routes each input line to a handler
- `streaming`: runs a single streamed chat turn
- `chat`: wires the terminal, backend, and store together
*/

pub mod dispatcher;
pub mod special_commands;
pub mod streaming;

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Builds the backend, session, and chat store from configuration and
    //! runs the dispatcher against a readline-based terminal.

    use super::dispatcher::{ChatDispatcher, LineSource};
    use crate::config::Config;
    use crate::error::Result;
    use crate::providers::{create_provider, GenerationOptions};
    use crate::session::Session;
    use crate::storage::ChatStore;
    use anyhow::Context;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Terminal input backed by rustyline
    ///
    /// Ctrl-C and Ctrl-D both read as end of input.
    pub struct TerminalInput {
        editor: DefaultEditor,
    }

    impl TerminalInput {
        /// Create a line editor on the controlling terminal
        ///
        /// # Errors
        ///
        /// Returns error if the terminal cannot be initialized
        pub fn new() -> Result<Self> {
            Ok(Self {
                editor: DefaultEditor::new()?,
            })
        }
    }

    impl LineSource for TerminalInput {
        fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
            match self.editor.readline(prompt) {
                Ok(line) => Ok(Some(line)),
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
                Err(err) => Err(err.into()),
            }
        }

        fn add_history(&mut self, line: &str) {
            if let Err(e) = self.editor.add_history_entry(line) {
                tracing::debug!("Failed to add history entry: {}", e);
            }
        }
    }

    /// Start interactive chat
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration (consumed)
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot list models at startup, or if the
    /// terminal fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use maxchat::commands::chat;
    /// use maxchat::config::Config;
    ///
    /// # async fn example() -> maxchat::error::Result<()> {
    /// chat::run_chat(Config::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat");

        let provider = create_provider(&config.ollama)?;
        let session = Session::with_params(
            config.ollama.model.clone(),
            config.chat.system_prompt.clone(),
            GenerationOptions {
                temperature: config.chat.temperature,
                context_window: config.chat.context_window,
            },
        );
        let store = ChatStore::new(&config.chat.chats_dir);

        let mut input = TerminalInput::new()?;
        let mut dispatcher = ChatDispatcher::new(session, provider, store, std::io::stdout());

        dispatcher.start(&mut input).await.with_context(|| {
            format!("Could not list models from Ollama at {}", config.ollama.host)
        })?;
        dispatcher.run(&mut input).await
    }
}
