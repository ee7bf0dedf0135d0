//! Error types shared across montage crates.

use std::path::PathBuf;

/// Top-level error type for montage operations.
#[derive(Debug, thiserror::Error)]
pub enum MontageError {
    #[error("Media engine error: {message}")]
    Media { message: String },

    #[error("Extraction error: {message}")]
    Extraction { message: String },

    #[error("Composite error: {message}")]
    Composite { message: String },

    #[error("Library error: {message}")]
    Library { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A run cannot produce any output at all (empty note list, zero usable clips).
    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MontageError.
pub type MontageResult<T> = Result<T, MontageError>;

impl MontageError {
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    pub fn composite(msg: impl Into<String>) -> Self {
        Self::Composite {
            message: msg.into(),
        }
    }

    pub fn library(msg: impl Into<String>) -> Self {
        Self::Library {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    /// Whether this error aborts a whole run rather than a single item.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}
