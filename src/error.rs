// Error types shared by the credential store and the API gateway.
// The interactive layer wraps these in `anyhow` like the rest of the CLI.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or writing the local credential file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read credential file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("failed to read credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write credential file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures talking to the Moltbook API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no agent data found in registration response")]
    MissingAgent,
    #[error("stored API key cannot be sent as a header")]
    InvalidApiKey,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// True when the HTTP exchange itself failed (network, status, body).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::Transport { .. } | ApiError::Status { .. } | ApiError::Decode { .. }
        )
    }
}
