use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("failed to read feed file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to write memory file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize published hashes: {0}")]
    Serialize(#[from] serde_json::Error),
}
