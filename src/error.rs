//! Error types for chatline.

use std::path::PathBuf;
use thiserror::Error;

/// Library-level error type for chatline operations.
#[derive(Error, Debug)]
pub enum ChatlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Chat API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response event: {message}\nReceived data: {raw}")]
    Decode { message: String, raw: String },

    #[error("Model requested an unknown tool: {0}")]
    UnknownTool(String),

    #[error("Exchange exceeded the maximum of {0} tool round(s)")]
    ToolRoundsExceeded(usize),

    #[error("Corrupt history log {path}, line {line}: {source}")]
    HistoryCorrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

/// Result type alias for chatline operations.
pub type Result<T> = std::result::Result<T, ChatlineError>;
