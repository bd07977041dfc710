use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use nbsim_core::constants::DEFAULT_NOTEBOOK_PATH;

use crate::api_error::ApiError;
use crate::api_types::GenerateResponse;
use crate::AppState;

/// `POST /_gen`: generates the notebook for `{"url": path}` and returns its
/// artifact URL once rendered.
///
/// The body is decoded without looking at the content type. A missing or
/// non-string `url` falls back to the default notebook path.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let payload: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(error = %e, "invalid generation payload");
            ApiError::BadRequest(e.to_string())
        })?;
    let path = payload.get("url").and_then(serde_json::Value::as_str).unwrap_or(DEFAULT_NOTEBOOK_PATH);

    let url = state.service.generate_notebook(path).await?;
    Ok(Json(GenerateResponse { url }))
}
