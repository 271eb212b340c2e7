//! Error types for Viddex.

use thiserror::Error;

/// Library-level error type for Viddex operations.
#[derive(Error, Debug)]
pub enum ViddexError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transcript(#[from] crate::transcript::TranscriptError),

    #[error("Search index error: {0}")]
    SearchIndex(String),

    #[error("Indexing failed: no pages indexed")]
    NothingIndexed,

    #[error("Video store error: {0}")]
    VideoStore(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Pipeline step '{step}' failed after {attempts} attempts: {source}")]
    StepExhausted {
        step: String,
        attempts: u32,
        #[source]
        source: Box<ViddexError>,
    },

    #[error("Pipeline step '{0}' timed out")]
    StepTimeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Viddex operations.
pub type Result<T> = std::result::Result<T, ViddexError>;
