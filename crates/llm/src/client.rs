use std::time::Duration;

use nbsim_core::env_string_or;

use crate::ai_types::{Message, MessagesRequest};
use crate::error::LlmError;
use crate::prompt::SYSTEM_PROMPT;
use crate::sse::text_deltas;
use crate::ChunkStream;

/// Default model to use.
pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
/// Default Messages API origin.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
/// `anthropic-version` header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Token budget of one notebook.
pub const MAX_TOKENS: u32 = 4096;
/// Sampling temperature; notebooks should vary between paths.
pub const TEMPERATURE: f32 = 1.0;

const MAX_RETRIES: usize = 3;
const RETRY_DELAYS: [u64; 4] = [0, 1, 2, 4];

/// Client for the streaming Messages API.
pub struct LlmClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) model: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("client", &self.client)
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl LlmClient {
    /// Creates a new LLM client with the given API key and base URL.
    ///
    /// The model comes from `NBSIM_MODEL` when set.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(api_key: String, base_url: String) -> Result<Self, LlmError> {
        let model = env_string_or("NBSIM_MODEL", DEFAULT_MODEL);
        let base_url = base_url.trim_end_matches('/').to_owned();
        // Only the connect phase is bounded; a notebook can take minutes to stream.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LlmError::ClientInit(e.to_string()))?;
        Ok(Self { client, api_key, base_url, model })
    }

    /// Sets a custom model for this client.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Streams the reply to `messages` as text deltas.
    ///
    /// Only opening the stream is retried; once deltas flow, a failure ends the
    /// stream with an error item.
    ///
    /// # Errors
    /// Returns an error if the request cannot be sent, the API answers with a
    /// non-transient error status, or all retries are exhausted.
    pub async fn stream_chat(&self, messages: &[Message]) -> Result<ChunkStream, LlmError> {
        let request = MessagesRequest {
            model: &self.model,
            system: Some(SYSTEM_PROMPT),
            messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            stream: true,
        };
        let response = self.open_stream(&request).await?;
        Ok(text_deltas(response.bytes_stream()))
    }

    async fn open_stream(
        &self,
        request: &MessagesRequest<'_>,
    ) -> Result<reqwest::Response, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay_secs = RETRY_DELAYS.get(attempt).copied().unwrap_or(4);
                let delay = Duration::from_secs(delay_secs);
                tokio::time::sleep(delay).await;
                tracing::warn!("LLM retry attempt {attempt}/{MAX_RETRIES} after {delay:?}");
            }

            let response_result = self
                .client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(request)
                .send()
                .await;

            let response = match response_result {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Request(e));
                    continue;
                },
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let status_code = status.as_u16();
            let body =
                response.text().await.unwrap_or_else(|_| "Could not read error body".to_owned());

            let err = LlmError::Status { code: status_code, body };
            if err.is_transient() {
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        let last = last_error.unwrap_or_else(|| LlmError::Stream("no attempt was made".to_owned()));
        Err(LlmError::RetriesExhausted { attempts: MAX_RETRIES + 1, last: Box::new(last) })
    }
}

/// Truncates a string to the given maximum length at a char boundary.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        s.get(..end).unwrap_or("")
    }
}
