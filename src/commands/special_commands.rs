//! Special commands parser for interactive chat
//!
//! Every line typed at the chat prompt is either a special command or a chat
//! turn. Special commands start with `/` and are looked up in a single
//! declarative table, [`COMMANDS`], which also drives `/help`:
//! - Commands without arguments match only when typed exactly
//! - `/save <name>` takes the first word after the command
//! - `/system <text>` takes the rest of the line
//! - `EXIT` (any case) is accepted as an alias for `/bye`
//!
//! Anything that is not a recognized command, including an unknown `/word`,
//! is a chat turn.

use colored::Colorize;
use std::io::Write;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The line was empty or whitespace
    #[error("Invalid input. Try again.")]
    EmptyInput,

    /// Command requires an argument but none was provided
    #[error("Error: {hint}\nUsage: {usage}")]
    MissingArgument {
        usage: String,
        hint: String,
    },
}

/// Special commands that can be executed during interactive chat
///
/// These commands change the session or report on it, rather than being
/// sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// End the session
    Exit,

    /// Print the transcript with 1-based indexes
    History,

    /// Print the command table
    Help,

    /// Enumerate backend models and prompt for a selection
    ListModels,

    /// Save the conversation under the given name
    Save(String),

    /// Enumerate saved chats and prompt for one to load
    Load,

    /// Print the selected model
    Current,

    /// Reset the transcript and generation parameters
    Clear,

    /// Replace the system prompt
    SetSystemPrompt(String),

    /// Prompt for temperature and context window
    Params,

    /// Not a special command
    ///
    /// The line is sent to the model as a user turn.
    Chat(String),
}

/// How a command consumes the rest of its line
#[derive(Debug, Clone)]
pub enum CommandAction {
    /// Takes no argument; the line must be exactly the token
    Plain(SpecialCommand),
    /// Takes the first whitespace-separated word after the token
    Word(fn(String) -> SpecialCommand),
    /// Takes the trimmed remainder of the line after the token
    Text(fn(String) -> SpecialCommand),
}

/// One row of the command table
#[derive(Debug, Clone)]
pub struct CommandEntry {
    /// Command token, including the leading `/`
    pub token: &'static str,
    /// Usage as shown in help
    pub usage: &'static str,
    /// One-line description shown in help
    pub description: &'static str,
    /// Reported when a required argument is missing
    pub missing_hint: &'static str,
    /// How the line is turned into a command
    pub action: CommandAction,
}

/// The command table, in help order
pub const COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        token: "/help",
        usage: "/help",
        description: "Show available commands.",
        missing_hint: "",
        action: CommandAction::Plain(SpecialCommand::Help),
    },
    CommandEntry {
        token: "/list",
        usage: "/list",
        description: "Show available models.",
        missing_hint: "",
        action: CommandAction::Plain(SpecialCommand::ListModels),
    },
    CommandEntry {
        token: "/system",
        usage: "/system <text>",
        description: "Set the content of the system prompt and reset messages.",
        missing_hint: "specify valid content for the SYSTEM_PROMPT.",
        action: CommandAction::Text(SpecialCommand::SetSystemPrompt),
    },
    CommandEntry {
        token: "/save",
        usage: "/save <name>",
        description: "Save the current chat with the specified name.",
        missing_hint: "specify a name for the save file.",
        action: CommandAction::Word(SpecialCommand::Save),
    },
    CommandEntry {
        token: "/load",
        usage: "/load",
        description: "Load a saved chat.",
        missing_hint: "",
        action: CommandAction::Plain(SpecialCommand::Load),
    },
    CommandEntry {
        token: "/current",
        usage: "/current",
        description: "Show the currently used model.",
        missing_hint: "",
        action: CommandAction::Plain(SpecialCommand::Current),
    },
    CommandEntry {
        token: "/clear",
        usage: "/clear",
        description: "Reset the chat history and generation parameters.",
        missing_hint: "",
        action: CommandAction::Plain(SpecialCommand::Clear),
    },
    CommandEntry {
        token: "/history",
        usage: "/history",
        description: "Show chat history.",
        missing_hint: "",
        action: CommandAction::Plain(SpecialCommand::History),
    },
    CommandEntry {
        token: "/params",
        usage: "/params",
        description: "Set the temperature and num_ctx interactively.",
        missing_hint: "",
        action: CommandAction::Plain(SpecialCommand::Params),
    },
    CommandEntry {
        token: "/bye",
        usage: "/bye",
        description: "Exit the chat.",
        missing_hint: "",
        action: CommandAction::Plain(SpecialCommand::Exit),
    },
];

/// Parse a line of user input
///
/// # Arguments
///
/// * `input` - The raw line typed at the chat prompt
///
/// # Returns
///
/// Returns the matching special command, or `SpecialCommand::Chat` carrying
/// the line exactly as typed when it is not a command. Trimming is only used
/// to classify the line.
///
/// # Errors
///
/// Returns `CommandError::EmptyInput` for an empty or whitespace-only line.
/// Returns `CommandError::MissingArgument` for `/save` or `/system` without
/// an argument.
///
/// # Examples
///
/// ```
/// use maxchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/bye").unwrap(), SpecialCommand::Exit);
/// assert_eq!(
///     parse_special_command("/save test1").unwrap(),
///     SpecialCommand::Save("test1".to_string())
/// );
/// assert_eq!(
///     parse_special_command("Hello").unwrap(),
///     SpecialCommand::Chat("Hello".to_string())
/// );
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandError::EmptyInput);
    }

    if trimmed.eq_ignore_ascii_case("exit") {
        return Ok(SpecialCommand::Exit);
    }

    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };

    let Some(entry) = COMMANDS.iter().find(|entry| entry.token == head) else {
        return Ok(SpecialCommand::Chat(input.to_string()));
    };

    match &entry.action {
        CommandAction::Plain(command) if rest.is_empty() => Ok(command.clone()),
        CommandAction::Plain(_) => Ok(SpecialCommand::Chat(input.to_string())),
        CommandAction::Word(build) => match rest.split_whitespace().next() {
            Some(word) => Ok(build(word.to_string())),
            None => Err(missing_argument(entry)),
        },
        CommandAction::Text(build) if !rest.is_empty() => Ok(build(rest.to_string())),
        CommandAction::Text(_) => Err(missing_argument(entry)),
    }
}

fn missing_argument(entry: &CommandEntry) -> CommandError {
    CommandError::MissingArgument {
        usage: entry.usage.to_string(),
        hint: entry.missing_hint.to_string(),
    }
}

/// Write the command table
///
/// # Errors
///
/// Returns error if writing to `out` fails
pub fn write_help<W: Write>(out: &mut W) -> std::io::Result<()> {
    for entry in COMMANDS {
        let line = format!("{:<16}- {}", entry.usage, entry.description);
        writeln!(out, "{}", line.green())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exit_with_slash() {
        assert_eq!(parse_special_command("/bye").unwrap(), SpecialCommand::Exit);
    }

    #[test]
    fn test_parse_exit_case_insensitive() {
        for input in ["EXIT", "exit", "Exit", "  eXiT  "] {
            assert_eq!(
                parse_special_command(input).unwrap(),
                SpecialCommand::Exit,
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_parse_plain_commands() {
        let cases = [
            ("/history", SpecialCommand::History),
            ("/help", SpecialCommand::Help),
            ("/list", SpecialCommand::ListModels),
            ("/load", SpecialCommand::Load),
            ("/current", SpecialCommand::Current),
            ("/clear", SpecialCommand::Clear),
            ("/params", SpecialCommand::Params),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_special_command(input).unwrap(), expected);
        }
    }

    #[test]
    fn test_parse_with_whitespace() {
        assert_eq!(
            parse_special_command("  /help \n").unwrap(),
            SpecialCommand::Help
        );
    }

    #[test]
    fn test_parse_slash_tokens_are_case_sensitive() {
        assert_eq!(
            parse_special_command("/HELP").unwrap(),
            SpecialCommand::Chat("/HELP".to_string())
        );
        assert_eq!(
            parse_special_command("/Bye").unwrap(),
            SpecialCommand::Chat("/Bye".to_string())
        );
    }

    #[test]
    fn test_parse_plain_command_with_argument_is_chat() {
        assert_eq!(
            parse_special_command("/history now").unwrap(),
            SpecialCommand::Chat("/history now".to_string())
        );
    }

    #[test]
    fn test_parse_unknown_command_is_chat() {
        assert_eq!(
            parse_special_command("/models").unwrap(),
            SpecialCommand::Chat("/models".to_string())
        );
    }

    #[test]
    fn test_parse_prefix_is_not_a_command() {
        assert_eq!(
            parse_special_command("/savefile").unwrap(),
            SpecialCommand::Chat("/savefile".to_string())
        );
    }

    #[test]
    fn test_parse_regular_text_is_chat() {
        assert_eq!(
            parse_special_command("Hello there").unwrap(),
            SpecialCommand::Chat("Hello there".to_string())
        );
    }

    #[test]
    fn test_parse_chat_keeps_line_as_typed() {
        assert_eq!(
            parse_special_command("  Hello there  ").unwrap(),
            SpecialCommand::Chat("  Hello there  ".to_string())
        );
        assert_eq!(
            parse_special_command(" /models list").unwrap(),
            SpecialCommand::Chat(" /models list".to_string())
        );
    }

    #[test]
    fn test_parse_exit_inside_sentence_is_chat() {
        assert_eq!(
            parse_special_command("exit now").unwrap(),
            SpecialCommand::Chat("exit now".to_string())
        );
    }

    #[test]
    fn test_parse_empty_string_is_error() {
        assert_eq!(parse_special_command(""), Err(CommandError::EmptyInput));
        assert_eq!(parse_special_command("   \t"), Err(CommandError::EmptyInput));
    }

    #[test]
    fn test_parse_save_takes_first_word() {
        assert_eq!(
            parse_special_command("/save test1").unwrap(),
            SpecialCommand::Save("test1".to_string())
        );
        assert_eq!(
            parse_special_command("/save   first second").unwrap(),
            SpecialCommand::Save("first".to_string())
        );
    }

    #[test]
    fn test_parse_save_missing_name() {
        let err = parse_special_command("/save").unwrap_err();
        assert_eq!(
            err,
            CommandError::MissingArgument {
                usage: "/save <name>".to_string(),
                hint: "specify a name for the save file.".to_string(),
            }
        );
        assert!(err
            .to_string()
            .starts_with("Error: specify a name for the save file."));
        assert!(parse_special_command("/save   ").is_err());
    }

    #[test]
    fn test_parse_system_takes_remainder() {
        assert_eq!(
            parse_special_command("/system Reply only in French.").unwrap(),
            SpecialCommand::SetSystemPrompt("Reply only in French.".to_string())
        );
        assert_eq!(
            parse_special_command("/system\tBe   terse ").unwrap(),
            SpecialCommand::SetSystemPrompt("Be   terse".to_string())
        );
    }

    #[test]
    fn test_parse_system_missing_text() {
        let err = parse_special_command("/system").unwrap_err();
        assert!(matches!(
            err,
            CommandError::MissingArgument { ref usage, .. } if usage == "/system <text>"
        ));
        assert!(err.to_string().contains("SYSTEM_PROMPT"));
    }

    #[test]
    fn test_command_tokens_are_unique() {
        for (i, a) in COMMANDS.iter().enumerate() {
            for b in &COMMANDS[i + 1..] {
                assert_ne!(a.token, b.token);
            }
        }
    }

    #[test]
    fn test_write_help_lists_every_command() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        write_help(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), COMMANDS.len());
        assert!(text.contains("/help           - Show available commands."));
        assert!(text.contains("/system <text>  - Set the content of the system prompt"));
        assert!(text.contains("/bye            - Exit the chat."));
    }
}
