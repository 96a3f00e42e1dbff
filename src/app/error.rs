use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedwatchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body_prefix}")]
    HttpStatus { status: u16, body_prefix: String },

    #[error("Empty response body")]
    EmptyBody,

    #[error("Response is not an XML feed (bot challenge: {challenge})")]
    Blocked { challenge: bool },

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Failed to read state file {path}: {reason}")]
    StorageRead { path: PathBuf, reason: String },

    #[error("Failed to write state file {path}: {reason}")]
    StorageWrite { path: PathBuf, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FeedwatchError {
    /// Whether the operator should be told about this failure through the notifier.
    pub fn is_http_status(&self) -> bool {
        matches!(self, FeedwatchError::HttpStatus { .. })
    }
}

pub type Result<T> = std::result::Result<T, FeedwatchError>;
