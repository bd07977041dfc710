//! LLM client that writes notebooks
//!
//! Streams replies from the Anthropic Messages API as plain text deltas.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]

mod ai_types;
mod client;
mod error;
mod generator;
mod prompt;
mod sse;

#[cfg(test)]
mod retry_tests;

use std::pin::Pin;

use futures_util::Stream;

pub use ai_types::{Message, Role};
pub use client::{
    truncate, LlmClient, ANTHROPIC_VERSION, DEFAULT_BASE_URL, DEFAULT_MODEL, MAX_TOKENS,
};
pub use error::LlmError;
pub use generator::{notebook_messages, Conversation, NotebookGenerator};
pub use prompt::{NOTEBOOK_PREFILL, SYSTEM_PROMPT};
pub use sse::{SseDecoder, SseEvent};

/// Text deltas of one streamed reply.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;
