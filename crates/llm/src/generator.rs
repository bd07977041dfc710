//! The seam between the generation service and the model.

use async_trait::async_trait;

use crate::ai_types::Message;
use crate::client::LlmClient;
use crate::error::LlmError;
use crate::prompt::NOTEBOOK_PREFILL;
use crate::ChunkStream;

/// Produces notebook JSON for a requested path, one chunk at a time.
///
/// Chunks continue an object whose opening `{` has already been written.
#[async_trait]
pub trait NotebookGenerator: Send + Sync {
    async fn stream_notebook(&self, path: &str) -> Result<ChunkStream, LlmError>;
}

/// Opening exchange for a single path: the path as the user turn and the
/// prefilled `{` as the start of the reply.
#[must_use]
pub fn notebook_messages(path: &str) -> Vec<Message> {
    vec![Message::user(path), Message::assistant(NOTEBOOK_PREFILL)]
}

#[async_trait]
impl NotebookGenerator for LlmClient {
    async fn stream_notebook(&self, path: &str) -> Result<ChunkStream, LlmError> {
        tracing::debug!(path, model = %self.model, "requesting notebook stream");
        self.stream_chat(&notebook_messages(path)).await
    }
}

/// Multi-turn history for the interactive REPL.
///
/// Unlike single-path generation every finished reply is kept, so follow-up
/// prompts can refer to the notebook written so far.
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages to send for `prompt`: history, the prompt, and the prefill.
    #[must_use]
    pub fn request_for(&self, prompt: &str) -> Vec<Message> {
        let mut messages = self.messages.clone();
        messages.push(Message::user(prompt));
        messages.push(Message::assistant(NOTEBOOK_PREFILL));
        messages
    }

    /// Records a finished exchange; `reply` excludes the prefill.
    pub fn record(&mut self, prompt: &str, reply: &str) {
        self.messages.push(Message::user(prompt));
        self.messages.push(Message::assistant(format!("{NOTEBOOK_PREFILL}{reply}")));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
