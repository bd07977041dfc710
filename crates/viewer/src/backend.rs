//! Where a viewer sends its generation request.

use async_trait::async_trait;
use nbsim_core::constants::GENERATE_ROUTE;
use serde::Serialize;

use crate::error::ViewerError;

/// Turns a requested path into the URL of its generated document.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, path: &str) -> Result<String, ViewerError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    url: &'a str,
}

/// Backend talking to a generation service over HTTP.
///
/// No timeout is configured: the request waits for a response or a network
/// failure.
#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    client: reqwest::Client,
    origin: String,
}

impl HttpGenerationClient {
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), origin)
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, origin: impl Into<String>) -> Self {
        let origin = origin.into().trim_end_matches('/').to_owned();
        Self { client, origin }
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationClient {
    async fn generate(&self, path: &str) -> Result<String, ViewerError> {
        let endpoint = format!("{}{GENERATE_ROUTE}", self.origin);
        tracing::debug!(%endpoint, path, "requesting generation");

        let response =
            self.client.post(&endpoint).json(&GenerateRequest { url: path }).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ViewerError::Status { code: status.as_u16(), body });
        }

        let value: serde_json::Value = serde_json::from_str(&body)?;
        value
            .get("url")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .ok_or(ViewerError::MissingUrl)
    }
}
