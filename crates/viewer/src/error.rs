//! Error type for the generation exchange.

use thiserror::Error;

/// Why a generation request produced no usable destination.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The request could not be sent or the response body not read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation service returned {code}: {body}")]
    Status { code: u16, body: String },

    /// The response body was not JSON.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response has no string `url` field")]
    MissingUrl,

    /// An in-process backend failed.
    #[error("backend: {0}")]
    Backend(String),
}
