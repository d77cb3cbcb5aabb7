//! Error types for the text front end and audio helpers.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for `thaitts` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed lexicon file
    #[error("Invalid lexicon {path}: {message}")]
    Lexicon { path: PathBuf, message: String },

    /// Base vocabulary could not be loaded
    #[error("Invalid vocabulary {path}: {message}")]
    Vocabulary { path: PathBuf, message: String },

    /// Segmentation dictionary could not be built
    #[error("Cannot build dictionary: {0}")]
    Dictionary(String),

    /// WAV encode / decode error
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Speech engine failure
    #[error("Engine error: {0}")]
    Engine(String),
}

/// Result type alias for `thaitts` operations.
pub type Result<T> = std::result::Result<T, Error>;
