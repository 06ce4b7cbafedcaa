//! Transport error types

use std::time::Duration;
use thiserror::Error;

use crate::domain::BackendId;

/// Errors that can occur while fetching a backend's data set
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Gateway returned {status} for backend {backend_id}: {message}")]
    Status {
        backend_id: BackendId,
        status: u16,
        message: String,
    },

    #[error("Malformed payload: {0}")]
    Payload(String),

    #[error("Backend id '{backend_id}' cannot address a data set: {reason}")]
    UnsafeId { backend_id: BackendId, reason: String },

    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

/// Errors that end the registry event feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to connect to event feed: {0}")]
    Connect(String),

    #[error("Event feed stream error: {0}")]
    Stream(String),

    #[error("Undecodable event: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Undecodable event on line {line}: {source}")]
    DecodeLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
