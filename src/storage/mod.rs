use anyhow::Context;
use crate::error::{MaxchatError, Result};
use std::path::{Path, PathBuf};

pub mod types;
pub use types::SavedChat;

const CHAT_EXTENSION: &str = "json";

/// File-backed store of saved chats
///
/// Each chat lives in `<dir>/<name>.json` as pretty-printed JSON. The
/// directory is created on first save.
pub struct ChatStore {
    dir: PathBuf,
}

impl ChatStore {
    /// Create a store rooted at `dir`
    ///
    /// The directory is not touched until the first save.
    ///
    /// # Examples
    ///
    /// ```
    /// use maxchat::storage::ChatStore;
    ///
    /// let store = ChatStore::new("chats");
    /// assert_eq!(store.dir(), std::path::Path::new("chats"));
    /// ```
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the saved chats
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `chat` under `name`, replacing any previous chat with that name
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns `MaxchatError::InvalidChatName` if `name` cannot be used as a
    /// file stem, or `MaxchatError::Io` if the write fails.
    pub fn save(&self, name: &str, chat: &SavedChat) -> Result<PathBuf> {
        let path = self.path_for(name)?;

        std::fs::create_dir_all(&self.dir)
            .map_err(MaxchatError::Io)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let json = serde_json::to_string_pretty(chat)
            .map_err(MaxchatError::Serialization)
            .context("Failed to serialize chat")?;

        std::fs::write(&path, json)
            .map_err(MaxchatError::Io)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(name, path = %path.display(), "Chat saved");
        Ok(path)
    }

    /// Names of all saved chats, sorted
    ///
    /// A missing directory lists as empty.
    ///
    /// # Errors
    ///
    /// Returns `MaxchatError::Io` if the directory exists but cannot be read
    pub fn list_keys(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(MaxchatError::Io(e))
                    .with_context(|| format!("Failed to read {}", self.dir.display()))
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(MaxchatError::Io)
                .with_context(|| format!("Failed to read {}", self.dir.display()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(CHAT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Read the chat saved under `name`
    ///
    /// # Errors
    ///
    /// Returns `MaxchatError::ChatNotFound` if no such chat exists, or
    /// `MaxchatError::CorruptChat` if the file is not a valid saved chat.
    pub fn load(&self, name: &str) -> Result<SavedChat> {
        let path = self.path_for(name)?;

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MaxchatError::ChatNotFound(name.to_string()).into())
            }
            Err(e) => {
                return Err(MaxchatError::Io(e))
                    .with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let chat: SavedChat =
            serde_json::from_str(&contents).map_err(|e| MaxchatError::CorruptChat {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(name, messages = chat.messages.len(), "Chat loaded");
        Ok(chat)
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.{}", name, CHAT_EXTENSION)))
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(MaxchatError::InvalidChatName(name.to_string()).into());
    }
    Ok(())
}
