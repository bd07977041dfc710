use serde::Serialize;

/// Body of a successful `/_gen` response.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// Artifact URL relative to the server root.
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}
