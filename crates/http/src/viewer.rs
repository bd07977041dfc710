//! Server-rendered viewer pages.
//!
//! Any path that is neither a route nor a generated file gets a page whose
//! frame shows the notebook for that path. The viewer effect runs in-process
//! against the generation service instead of looping back over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use nbsim_core::constants::STREAM_ROUTE_PREFIX;
use nbsim_core::escape_html;
use nbsim_service::GenerationService;
use nbsim_viewer::{GenerationBackend, Viewer, ViewerError};

use crate::AppState;

/// In-process backend: a finished document is shown directly, anything else
/// is streamed while it generates.
pub struct ServiceBackend {
    service: Arc<GenerationService>,
}

impl ServiceBackend {
    #[must_use]
    pub fn new(service: Arc<GenerationService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl GenerationBackend for ServiceBackend {
    async fn generate(&self, path: &str) -> Result<String, ViewerError> {
        if let Some(url) = self.service.finished_url(path).await {
            return Ok(url);
        }
        Ok(format!("{STREAM_ROUTE_PREFIX}{path}"))
    }
}

fn page(path: &str, frame: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{frame}\n</body>\n</html>\n",
        escape_html(path)
    )
}

pub async fn serve_viewer_page(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let path = uri.path().to_owned();
    let backend = Arc::new(ServiceBackend::new(Arc::clone(&state.service)));
    let viewer = Viewer::new(path.clone(), state.origin.clone(), backend);
    viewer.mount().await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        Html(page(&path, &viewer.render())),
    )
        .into_response()
}
