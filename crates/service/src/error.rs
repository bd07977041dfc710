//! Typed error enum for the service layer.
//!
//! Unifies model, notebook and conversion failures so that the HTTP layer can
//! map them to status codes without downcasting.

use nbsim_core::CoreError;
use nbsim_llm::LlmError;
use thiserror::Error;

/// Service-layer error unifying LLM, filesystem and conversion failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// LLM API call or stream failed.
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    /// Notebook encoding failed.
    #[error("notebook: {0}")]
    Notebook(#[from] CoreError),

    /// Reading or writing generation artifacts failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The HTML converter ran but did not produce a document.
    #[error("conversion: {0}")]
    Conversion(String),

    /// Rendered HTML could not be split into cells.
    #[error("html: {0}")]
    Html(String),

    /// The raw notebook for a streamed view never appeared.
    #[error("notebook not started: {0}")]
    NotStarted(String),
}
