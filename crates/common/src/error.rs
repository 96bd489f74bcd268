//! Error types shared across LikeLines crates.

use std::path::PathBuf;

/// Top-level error type for LikeLines operations.
#[derive(Debug, thiserror::Error)]
pub enum LikelinesError {
    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid interaction: {message}")]
    InvalidEvent { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using LikelinesError.
pub type LikelinesResult<T> = Result<T, LikelinesError>;

impl LikelinesError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_event(msg: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: msg.into(),
        }
    }
}
