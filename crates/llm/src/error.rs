//! Failures talking to the Messages API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// The request could not be sent or the body stopped mid-stream.
    #[error("request to the Messages API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Messages API returned {code}: {body}")]
    Status { code: u16, body: String },

    /// A stream event carried JSON that is not a known event shape.
    #[error("malformed {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The API sent an `error` event after the stream had opened.
    #[error("stream error event: {0}")]
    Stream(String),

    #[error("client initialization failed: {0}")]
    ClientInit(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: usize, last: Box<LlmError> },
}

impl LlmError {
    /// Whether opening the stream again may succeed.
    ///
    /// Rate limits, overload (`529`) and gateway failures are transient; so
    /// is an `overloaded_error` event.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => !e.is_builder(),
            Self::Status { code, .. } => matches!(code, 408 | 429 | 500 | 502 | 503 | 504 | 529),
            Self::Stream(message) => message.starts_with("overloaded_error"),
            Self::Decode { .. } | Self::ClientInit(_) | Self::RetriesExhausted { .. } => false,
        }
    }
}
