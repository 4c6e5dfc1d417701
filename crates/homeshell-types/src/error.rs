//! Error types for homeshell.

use std::io;

/// Errors produced by the homeshell configuration and menu layers.
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("config error: {0}")]
    Config(String),

    /// A key that the config resource does not declare.
    #[error("invalid config key: {0}")]
    BadKey(String),

    /// The stored JSON value for `key` does not have the requested type.
    #[error("type error for key \"{key}\": expected {expected}, found {found}")]
    Type {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A config file could not be read, parsed or written.
    #[error("file error ({path}): {message}")]
    File { path: String, message: String },

    #[error("desktop entry error: {0}")]
    DesktopEntry(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LauncherError {
    /// Build a file-kind error for `path`.
    pub fn file(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::File {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// True for errors caused by file access rather than by data contents.
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::File { .. } | Self::Io(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, LauncherError>;
