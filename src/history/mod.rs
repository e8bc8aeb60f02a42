//! Chat transcripts and their on-disk session files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SESSION_PREFIX: &str = "Sesion_";
const SESSION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// Represents possible errors when saving or loading sessions.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Filesystem access failed.
    #[error("Session file error for {}: {source}", .path.display())]
    Io {
        /// File or folder involved
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// The session file is not a valid transcript.
    #[error("Invalid session file {}: {source}", .path.display())]
    Json {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
    /// The name does not refer to a file inside the history folder.
    #[error("Invalid session name: {0}")]
    InvalidName(String),
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person studying
    User,
    /// The model's answer
    Assistant,
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message
    pub role: Role,
    /// Markdown text of the message
    pub content: String,
}

impl Message {
    /// Creates a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered messages of one chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::new(Role::User, content));
    }

    /// Appends a completed assistant answer.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::new(Role::Assistant, content));
    }

    /// Replaces every message, e.g. after loading a session.
    pub fn replace(&mut self, other: Transcript) {
        *self = other;
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// The most recent assistant answer.
    pub fn last_assistant(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// The messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// Session files in one folder, named `Sesion_<timestamp>.json`.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Opens the store, creating the folder if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| HistoryError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The folder holding the session files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the transcript to a file stamped with the current local time.
    ///
    /// Returns `None` without writing when the transcript is empty. Saving
    /// twice within the same minute overwrites the earlier file.
    pub fn save(&self, transcript: &Transcript) -> Result<Option<PathBuf>, HistoryError> {
        self.save_at(transcript, Local::now())
    }

    /// Like [`save`](Self::save) with an explicit timestamp.
    pub fn save_at(
        &self,
        transcript: &Transcript,
        at: DateTime<Local>,
    ) -> Result<Option<PathBuf>, HistoryError> {
        if transcript.is_empty() {
            return Ok(None);
        }
        let path = self.dir.join(session_file_name(at));
        let json = serde_json::to_string_pretty(transcript).map_err(|source| {
            HistoryError::Json {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|source| HistoryError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), messages = transcript.len(), "saved session");
        Ok(Some(path))
    }

    /// Lists session file names, newest first.
    pub fn list(&self) -> Result<Vec<String>, HistoryError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| HistoryError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".json"))
            .collect();
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Reads a session by file name.
    pub fn load(&self, name: &str) -> Result<Transcript, HistoryError> {
        let file_name = Path::new(name)
            .file_name()
            .filter(|file_name| *file_name == name)
            .ok_or_else(|| HistoryError::InvalidName(name.to_string()))?;
        let path = self.dir.join(file_name);
        let content = fs::read_to_string(&path).map_err(|source| HistoryError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| HistoryError::Json { path, source })
    }
}

/// File name for a session saved at `at`.
pub fn session_file_name(at: DateTime<Local>) -> String {
    format!(
        "{}{}.json",
        SESSION_PREFIX,
        at.format(SESSION_TIMESTAMP_FORMAT)
    )
}
