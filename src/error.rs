use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced to the user by the snippet models.
///
/// A cancelled prompt is not represented here: prompts yield `None` and the
/// enclosing operation returns `Ok(())` without touching disk.
#[derive(Debug, Error)]
pub enum SnippetError {
    /// A required snippet field is missing or empty. Nothing has been written.
    #[error("{0}")]
    Validation(String),

    #[error("snippet file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("snippet \"{key}\" not found in {}", .path.display())]
    KeyNotFound { key: String, path: PathBuf },

    /// The persisted collection could not be parsed. Never repaired silently.
    #[error("failed to parse {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

impl SnippetError {
    pub fn validation(message: impl Into<String>) -> Self {
        SnippetError::Validation(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SnippetError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = SnippetError> = std::result::Result<T, E>;
